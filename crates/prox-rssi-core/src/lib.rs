//! Deterministic, fixed-point proximity-detection core for a BLE keyless-entry
//! anchor.
//!
//! This crate consumes a stream of raw BLE RSSI samples from one connected
//! phone and decides when it is close and stationary enough that a secure
//! handshake should be initiated. It is **not** an unlock authority: the
//! event it emits ([`Event::UnlockTriggered`]) is advisory only.
//!
//! The pipeline is: spike rejection (Hampel) → adaptive low-pass smoothing
//! (EMA) → feature extraction (stddev + fraction-above-threshold) → a
//! three-state proximity machine (FAR → CANDIDATE → LOCKOUT). Every stage is
//! integer-only, allocation-free, and total (no panics on any input this
//! crate accepts).
//!
//! # Usage
//!
//! ```
//! use prox_rssi_core::{AlphaLut, Params, ProxRssi};
//!
//! let mut p = ProxRssi::<128, 128, 1001>::new(
//!     Params::default(),
//!     AlphaLut::default_ramp(),
//! ).unwrap();
//!
//! p.push_raw(0, -80).unwrap();
//! let (event, features) = p.tick(0);
//! assert_eq!(event, prox_rssi_core::Event::None);
//! let _ = features;
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod ema;
pub mod error;
pub mod features;
pub mod fixed;
pub mod hampel;
pub mod log;
pub mod params;
pub mod ring;
pub mod state;

pub use ema::EmaState;
pub use error::ProxError;
pub use features::FeatureSnapshot;
pub use params::{AlphaLut, Params};
pub use ring::Ring;
pub use state::{Event, ProxState};

use crate::ring::ToQ4;

/// Raw RSSI sample stored in the raw ring: a signed dBm reading in
/// `[-127, -1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDbm(pub i8);

impl ToQ4 for RawDbm {
    fn to_q4(self) -> i16 {
        fixed::q4_of_dbm(self.0)
    }
}

/// Smoothed Q4 sample stored in the smooth ring: already in Q4 form, so the
/// conversion to Q4 is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothQ4(pub i16);

impl ToQ4 for SmoothQ4 {
    fn to_q4(self) -> i16 {
        self.0
    }
}

/// A single instance of the proximity-detection pipeline for one connected
/// phone.
///
/// `RAW_CAP` and `SMOOTH_CAP` are the ring capacities (the reference
/// implementation uses 128 for both); `LUT_CAP` is the capacity of the
/// internal copy of the α-LUT (1001 entries covers a 1 ms step out to a
/// 1000 ms sampling interval, matching the reference build).
///
/// Instance size is a compile-time constant: there is no heap allocation
/// anywhere in this type, at construction or afterward.
pub struct ProxRssi<const RAW_CAP: usize, const SMOOTH_CAP: usize, const LUT_CAP: usize> {
    params: Params,
    alpha_lut: AlphaLut<LUT_CAP>,
    raw: Ring<RawDbm, RAW_CAP>,
    smooth: Ring<SmoothQ4, SMOOTH_CAP>,
    ema: EmaState,
    machine: state::StateMachine,
    // Scratch arrays reused across ticks, mirroring the reference context's
    // tmpA/tmpB/tmpS fields. Never allocated per-call.
    scratch_a: [i16; RAW_CAP],
    scratch_b: [i16; RAW_CAP],
    scratch_feat: [i16; SMOOTH_CAP],
}

impl<const RAW_CAP: usize, const SMOOTH_CAP: usize, const LUT_CAP: usize>
    ProxRssi<RAW_CAP, SMOOTH_CAP, LUT_CAP>
{
    /// Builds a new instance, validating `params` and `alpha_lut`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxError::InvalidArgument`] if the LUT is empty. There is
    /// no other way to construct an invalid instance: every other parameter
    /// field has a documented defensive default applied when left at zero
    /// (see [`Params::validated`]).
    pub fn new(params: Params, alpha_lut: AlphaLut<LUT_CAP>) -> Result<Self, ProxError> {
        if alpha_lut.is_empty() {
            return Err(ProxError::InvalidArgument("alpha LUT must be non-empty"));
        }
        Ok(Self {
            params: params.validated(),
            alpha_lut,
            raw: Ring::new(),
            smooth: Ring::new(),
            ema: EmaState::new(),
            machine: state::StateMachine::new(),
            scratch_a: [0; RAW_CAP],
            scratch_b: [0; RAW_CAP],
            scratch_feat: [0; SMOOTH_CAP],
        })
    }

    /// Returns the effective (defensive-defaulted) parameters in use.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the current proximity state.
    #[must_use]
    pub fn state(&self) -> ProxState {
        self.machine.state()
    }

    /// Appends a raw `(t_ms, rssi_dbm)` sample to the raw ring.
    ///
    /// Does not run the pipeline; call [`ProxRssi::tick`] to process
    /// accumulated samples.
    ///
    /// # Errors
    ///
    /// Returns [`ProxError::InvalidArgument`] if `rssi_dbm == 127` (BLE's
    /// "unavailable" sentinel) or `rssi_dbm >= 0` (impossible for a real
    /// BLE reading). Values below `-127` are clamped up to `-127`, not
    /// rejected.
    pub fn push_raw(&mut self, t_ms: u32, rssi_dbm: i8) -> Result<(), ProxError> {
        if rssi_dbm == 127 {
            return Err(ProxError::InvalidArgument(
                "rssi value 127 is BLE's \"unavailable\" sentinel",
            ));
        }
        if rssi_dbm >= 0 {
            return Err(ProxError::InvalidArgument(
                "rssi value must be negative for a real BLE reading",
            ));
        }
        let clamped = rssi_dbm.max(-127);
        self.raw.push(t_ms, RawDbm(clamped));
        crate::pxtrace!("push_raw t={} dbm={}", t_ms, clamped);
        Ok(())
    }

    /// Advances the pipeline to `now_ms`, returning the event (if any) and a
    /// feature snapshot.
    ///
    /// This is a total function: it never panics and always returns a
    /// value, collapsing every internal failure mode (insufficient data,
    /// time anomaly) to [`Event::None`] and a zeroed [`FeatureSnapshot`].
    pub fn tick(&mut self, now_ms: u32) -> (Event, FeatureSnapshot) {
        self.raw.prune(now_ms, self.params.w_raw_ms);
        self.smooth.prune(now_ms, self.params.w_feat_ms);

        if self.raw.is_empty() {
            return (Event::None, FeatureSnapshot::default());
        }

        let Some(x_q4) = hampel::reject_spike(
            &self.raw,
            now_ms,
            self.params.w_spike_ms,
            self.params.hampel_k_q4,
            self.params.mad_eps_q4,
            &mut self.scratch_a,
            &mut self.scratch_b,
        ) else {
            return (Event::None, FeatureSnapshot::default());
        };

        let ema_q4 = self.ema.update(
            x_q4,
            now_ms,
            &self.alpha_lut,
            self.params.max_reasonable_dt_ms,
        );
        self.smooth.push(now_ms, SmoothQ4(ema_q4));
        self.smooth.prune(now_ms, self.params.w_feat_ms);

        let Some(f) = features::compute(
            &self.smooth,
            now_ms,
            self.params.w_feat_ms,
            self.params.min_feat_samples,
            self.params.enter_near_q4,
            &mut self.scratch_feat,
        ) else {
            return (Event::None, FeatureSnapshot::default());
        };

        let event = self.machine.step(now_ms, &f, &self.params);
        crate::pxdebug!("tick now={} state={:?} event={:?}", now_ms, self.state(), event);
        (event, f)
    }

    /// Resets the instance to FAR: clears both rings, invalidates the EMA,
    /// and zeroes all state-machine timers.
    ///
    /// Used when the underlying BLE connection drops.
    pub fn force_far(&mut self) {
        self.raw.clear();
        self.smooth.clear();
        self.ema = EmaState::new();
        self.machine = state::StateMachine::new();
        crate::pxinfo!("force_far");
    }
}
