//! Error taxonomy for the proximity-detection API.
//!
//! Only one kind of error is ever surfaced to a caller: [`ProxError`], raised
//! on API-boundary misuse. Internal failure modes (insufficient data in a
//! window, a time anomaly) are absorbed by the pipeline and never escape as
//! an error — they collapse to [`crate::Event::None`] for that tick.

use core::fmt;

/// The only error kind this crate ever returns to a caller.
///
/// Carries a static reason string so the single variant remains
/// diagnosable without needing a family of error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxError {
    /// An API-boundary precondition failed (empty LUT, out-of-range RSSI at
    /// `push_raw`).
    InvalidArgument(&'static str),
}

impl fmt::Display for ProxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
        }
    }
}

impl core::error::Error for ProxError {}
