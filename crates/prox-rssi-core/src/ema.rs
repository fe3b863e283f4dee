//! One-pole exponential moving average stage (C5), with a dt-adaptive gain
//! looked up from a caller-supplied table.

use crate::fixed::{mul_alpha_q15_delta_q4, time_diff};
use crate::params::AlphaLut;

/// State of the low-pass filter: either not yet seeded, or holding a
/// current Q4 value and the timestamp it was last updated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaState {
    valid: bool,
    value_q4: i16,
    prev_t_ms: u32,
}

impl Default for EmaState {
    fn default() -> Self {
        Self::new()
    }
}

impl EmaState {
    /// Returns an unseeded EMA state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            valid: false,
            value_q4: 0,
            prev_t_ms: 0,
        }
    }

    /// Returns the current filtered value, or `None` if never seeded.
    #[must_use]
    pub const fn value(&self) -> Option<i16> {
        if self.valid {
            Some(self.value_q4)
        } else {
            None
        }
    }

    /// Applies one sample to the filter, returning the updated value.
    ///
    /// Seeds on the first call. Fully resets (re-seeds, discarding the
    /// previous value) if `dt == 0` or `dt > max_reasonable_dt_ms` —
    /// refusing to smooth across a missed sample or a clock anomaly rather
    /// than producing a misleading blend.
    pub fn update<const CAP: usize>(
        &mut self,
        x_q4: i16,
        now_ms: u32,
        alpha_lut: &AlphaLut<CAP>,
        max_reasonable_dt_ms: u32,
    ) -> i16 {
        if !self.valid {
            self.valid = true;
            self.value_q4 = x_q4;
            self.prev_t_ms = now_ms;
            return self.value_q4;
        }

        let dt = time_diff(now_ms, self.prev_t_ms);
        if dt == 0 || dt > max_reasonable_dt_ms {
            self.value_q4 = x_q4;
            self.prev_t_ms = now_ms;
            return self.value_q4;
        }

        let alpha = alpha_lut.alpha_for_dt(dt);
        let delta = x_q4 - self.value_q4;
        self.value_q4 += mul_alpha_q15_delta_q4(alpha, delta);
        self.prev_t_ms = now_ms;
        self.value_q4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::q4_of_dbm;

    #[test]
    fn seeds_on_first_sample() {
        let mut ema = EmaState::new();
        let lut = AlphaLut::<1001>::default_ramp();
        let out = ema.update(q4_of_dbm(-55), 0, &lut, 2000);
        assert_eq!(out, q4_of_dbm(-55));
        assert_eq!(ema.value(), Some(q4_of_dbm(-55)));
    }

    #[test]
    fn converges_toward_stable_input() {
        let mut ema = EmaState::new();
        let lut = AlphaLut::<1001>::default_ramp();
        let target = q4_of_dbm(-55);
        let mut t = 0u32;
        let mut out = ema.update(target, t, &lut, 2000);
        for _ in 0..30 {
            t += 100;
            out = ema.update(target, t, &lut, 2000);
        }
        // Reference: within 2 dB (32 Q4 units) of -55 dBm after 30 samples
        // at 100 ms spacing.
        assert!((out - target).abs() <= 32);
    }

    #[test]
    fn resets_on_zero_dt() {
        let mut ema = EmaState::new();
        let lut = AlphaLut::<1001>::default_ramp();
        ema.update(q4_of_dbm(-80), 0, &lut, 2000);
        ema.update(q4_of_dbm(-80), 100, &lut, 2000);
        let out = ema.update(q4_of_dbm(-40), 100, &lut, 2000);
        assert_eq!(out, q4_of_dbm(-40));
    }

    #[test]
    fn resets_on_time_anomaly() {
        let mut ema = EmaState::new();
        let lut = AlphaLut::<1001>::default_ramp();
        let mut t = 0u32;
        for _ in 0..15 {
            ema.update(q4_of_dbm(-40), t, &lut, 2000);
            t += 100;
        }
        // a 3 s gap exceeds max_reasonable_dt_ms = 2000
        t += 3000;
        let out = ema.update(q4_of_dbm(-80), t, &lut, 2000);
        assert_eq!(out, q4_of_dbm(-80));
    }
}
