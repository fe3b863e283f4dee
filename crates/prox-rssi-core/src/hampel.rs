//! Hampel spike-rejection stage (C4).
//!
//! Rejects the most recently pushed raw sample if it is a large outlier
//! relative to the median of a short recent window, using median absolute
//! deviation (MAD) rather than mean/variance — MAD is robust to the single
//! spike this stage exists to catch, where variance is skewed by it.

use crate::fixed::{self, Q4_SCALE};
use crate::ring::{Ring, ToQ4};

/// Runs the Hampel filter over the raw ring's `w_spike_ms` window and
/// returns the accepted Q4 value for this tick.
///
/// Returns `None` if fewer than 3 samples fall in the window — there is not
/// enough data to compute a meaningful median and MAD, so this tick
/// produces no filtered value (the caller collapses this to
/// [`crate::Event::None`]).
///
/// `scratch_window` and `scratch_work` are reused across calls; both must
/// be at least as long as the raw ring's capacity.
pub fn reject_spike<T: ToQ4, const N: usize>(
    raw: &Ring<T, N>,
    now_ms: u32,
    w_spike_ms: u32,
    hampel_k_q4: i16,
    mad_eps_q4: i16,
    scratch_window: &mut [i16],
    scratch_work: &mut [i16],
) -> Option<i16> {
    let n = raw.copy_window_q4(now_ms, w_spike_ms, scratch_window);
    if n < 3 {
        return None;
    }
    let window = &scratch_window[..n];
    let work = &mut scratch_work[..n];

    work.copy_from_slice(window);
    fixed::insertion_sort(work);
    let median = fixed::median_of_sorted(work);

    for (i, &x) in window.iter().enumerate() {
        work[i] = ((x as i32) - (median as i32)).unsigned_abs() as i16;
    }
    fixed::insertion_sort(work);
    let mad = fixed::median_of_sorted(work).max(mad_eps_q4);

    // thr = hampel_k_q4 * mad * 1.5 / Q4_SCALE, all in Q4; the 1.5 factor is
    // the normal-distribution scale baked into the design.
    let thr = (hampel_k_q4 as i32 * mad as i32 * 3 / 2) / Q4_SCALE;

    let x_latest = raw.last()?.to_q4();
    if ((x_latest as i32) - (median as i32)).abs() > thr {
        Some(median)
    } else {
        Some(x_latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawDbm;

    fn feed(ring: &mut Ring<RawDbm, 128>, start_ms: u32, step_ms: u32, dbm: i8, count: u32) -> u32 {
        let mut t = start_ms;
        for _ in 0..count {
            ring.push(t, RawDbm(dbm));
            t += step_ms;
        }
        t
    }

    #[test]
    fn insufficient_samples_returns_none() {
        let mut ring = Ring::<RawDbm, 128>::new();
        ring.push(0, RawDbm(-50));
        ring.push(100, RawDbm(-50));
        let mut a = [0i16; 128];
        let mut b = [0i16; 128];
        assert_eq!(reject_spike(&ring, 100, 800, 48, 8, &mut a, &mut b), None);
    }

    #[test]
    fn passes_clean_signal_unchanged() {
        let mut ring = Ring::<RawDbm, 128>::new();
        let t = feed(&mut ring, 0, 100, -45, 20);
        let mut a = [0i16; 128];
        let mut b = [0i16; 128];
        let last_t = t - 100;
        let out = reject_spike(&ring, last_t, 800, 48, 8, &mut a, &mut b).unwrap();
        assert_eq!(out, fixed::q4_of_dbm(-45));
    }

    #[test]
    fn rejects_single_spike() {
        let mut ring = Ring::<RawDbm, 128>::new();
        let mut t = feed(&mut ring, 0, 100, -50, 10);
        ring.push(t, RawDbm(-20)); // a loud "+30 dB" spike relative to -50
        t += 100;
        let mut a = [0i16; 128];
        let mut b = [0i16; 128];
        let out = reject_spike(&ring, t - 100, 800, 48, 8, &mut a, &mut b).unwrap();
        // Output should be the robust median (-50), not the spike (-20).
        assert_eq!(out, fixed::q4_of_dbm(-50));
    }

    #[test]
    fn output_never_outside_window_bounds() {
        let mut ring = Ring::<RawDbm, 128>::new();
        let mut t = 0u32;
        for dbm in [-80i8, -70, -60, -50, -40, -30] {
            ring.push(t, RawDbm(dbm));
            t += 100;
        }
        let mut a = [0i16; 128];
        let mut b = [0i16; 128];
        let out = reject_spike(&ring, t - 100, 800, 48, 8, &mut a, &mut b).unwrap();
        assert!(out >= fixed::q4_of_dbm(-80) && out <= fixed::q4_of_dbm(-30));
    }
}
