//! Feature-extraction stage (C6): standard deviation and fraction-above-
//! threshold over the smoothed-ring feature window.

use crate::fixed::{isqrt_u32, Q15_ONE};
use crate::ring::{Ring, ToQ4};

/// A snapshot of the features computed from the smoothed-ring window on one
/// `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureSnapshot {
    /// Number of samples the window held when this snapshot was computed.
    pub n: usize,
    /// Fraction of samples at or above the entry threshold, in Q15.
    pub pct_above_enter_q15: u16,
    /// Sample standard deviation over the window, in Q4.
    pub std_q4: i16,
    /// The last sample visited walking the window tail-to-head (not
    /// necessarily the most recent by timestamp if the ring has wrapped;
    /// see the crate-level docs on scan order).
    pub last_q4: i16,
    /// Minimum Q4 value in the window.
    pub min_q4: i16,
    /// Maximum Q4 value in the window.
    pub max_q4: i16,
}

/// Computes features over the smooth ring's `w_feat_ms` window.
///
/// Returns `None` if fewer than `min_feat_samples` samples fall in the
/// window — in that case the caller skips the state-machine step for this
/// tick entirely, per [`crate::Event::None`]'s "no half-processed sample"
/// guarantee.
pub fn compute<T: ToQ4, const N: usize>(
    smooth: &Ring<T, N>,
    now_ms: u32,
    w_feat_ms: u32,
    min_feat_samples: usize,
    enter_near_q4: i16,
    scratch: &mut [i16],
) -> Option<FeatureSnapshot> {
    let n = smooth.copy_window_q4(now_ms, w_feat_ms, scratch);
    if n < min_feat_samples {
        return None;
    }
    let window = &scratch[..n];

    let mut sum: i64 = 0;
    let mut sum_sq: i64 = 0;
    let mut count_above = 0usize;
    let mut min_q4 = window[0];
    let mut max_q4 = window[0];
    for &x in window {
        sum += i64::from(x);
        sum_sq += i64::from(x) * i64::from(x);
        if x >= enter_near_q4 {
            count_above += 1;
        }
        min_q4 = min_q4.min(x);
        max_q4 = max_q4.max(x);
    }
    let last_q4 = window[n - 1];

    let n64 = n as i64;
    let pct_above_enter_q15 = (count_above as i64 * i64::from(Q15_ONE) / n64) as u16;

    let std_q4 = if n > 1 {
        let var_q8 = (sum_sq - sum * sum / n64).max(0) / (n64 - 1);
        isqrt_u32(var_q8 as u32) as i16
    } else {
        0
    };

    Some(FeatureSnapshot {
        n,
        pct_above_enter_q15,
        std_q4,
        last_q4,
        min_q4,
        max_q4,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::q4_of_dbm;
    use crate::SmoothQ4;

    #[test]
    fn insufficient_samples_returns_none() {
        let mut ring = Ring::<SmoothQ4, 128>::new();
        ring.push(0, SmoothQ4(q4_of_dbm(-50)));
        let mut scratch = [0i16; 128];
        assert_eq!(
            compute(&ring, 0, 2000, 6, q4_of_dbm(-50), &mut scratch),
            None
        );
    }

    #[test]
    fn stable_signal_has_zero_std_and_full_pct() {
        let mut ring = Ring::<SmoothQ4, 128>::new();
        let mut t = 0u32;
        for _ in 0..10 {
            ring.push(t, SmoothQ4(q4_of_dbm(-40)));
            t += 100;
        }
        let mut scratch = [0i16; 128];
        let f = compute(&ring, t - 100, 2000, 6, q4_of_dbm(-50), &mut scratch).unwrap();
        assert_eq!(f.std_q4, 0);
        assert_eq!(f.pct_above_enter_q15, Q15_ONE);
        assert_eq!(f.last_q4, q4_of_dbm(-40));
        assert_eq!(f.min_q4, q4_of_dbm(-40));
        assert_eq!(f.max_q4, q4_of_dbm(-40));
    }

    #[test]
    fn pct_above_enter_counts_correctly() {
        let mut ring = Ring::<SmoothQ4, 128>::new();
        let mut t = 0u32;
        // 5 above -50, 5 below -50
        for dbm in [-30i8, -35, -40, -45, -48, -60, -65, -70, -75, -80] {
            ring.push(t, SmoothQ4(q4_of_dbm(dbm)));
            t += 100;
        }
        let mut scratch = [0i16; 128];
        let f = compute(&ring, t - 100, 2000, 6, q4_of_dbm(-50), &mut scratch).unwrap();
        assert_eq!(f.n, 10);
        assert_eq!(f.pct_above_enter_q15 as u32, 5 * 32767 / 10);
    }

    #[test]
    fn std_never_exceeds_range() {
        let mut ring = Ring::<SmoothQ4, 128>::new();
        let mut t = 0u32;
        for dbm in [-30i8, -90, -40, -85, -35, -95] {
            ring.push(t, SmoothQ4(q4_of_dbm(dbm)));
            t += 100;
        }
        let mut scratch = [0i16; 128];
        let f = compute(&ring, t - 100, 2000, 6, q4_of_dbm(-50), &mut scratch).unwrap();
        assert!(f.std_q4 >= 0);
        assert!(f.std_q4 <= f.max_q4 - f.min_q4);
    }
}
