//! Sliding-window local polynomial smoothing.
//!
//! Independent of segmentation: the window is a fixed span of *time*, not a
//! fixed number of samples, so it adapts naturally to uneven cadence.

use crate::error::{check_light_curve, check_positive, DetrendError};
use crate::numeric::Polynomial;
use rayon::prelude::*;

/// Reference polynomial degree.
pub const DEFAULT_ORDER: usize = 3;
/// Reference window span in days.
pub const DEFAULT_WINDOW: f64 = 0.5;

/// Fit weighted polynomials in a sliding time window.
///
/// For each qualifying sample, all samples within `window / 2` of its
/// timestamp are fitted with a degree-`order` polynomial using inverse-error
/// weights, and the fit is evaluated at that timestamp. Samples outside the
/// qualifying range keep a value of `0.0` in the output, not their raw flux.
///
/// The qualifying range is `[time[0] + window/2, time[n-1] + window/2]`: the
/// upper bound uses `+ window/2` as well, reproducing the reference pipeline
/// exactly, so only the leading edge of the series is actually excluded.
///
/// This recomputes a windowed fit per sample and is by far the slowest
/// component of the toolchain; the per-sample fits run in parallel but no
/// incremental-window optimization is attempted.
pub fn rolling_poly(
    time: &[f64],
    flux: &[f64],
    error: &[f64],
    order: usize,
    window: f64,
) -> Result<Vec<f64>, DetrendError> {
    check_light_curve(time, flux, error)?;
    check_positive("window", window)?;

    let n = time.len();
    let half = window / 2.0;
    let lo = time[0] + half;
    let hi = time[n - 1] + half;
    let qualifying: Vec<usize> = (0..n)
        .filter(|&i| time[i] >= lo && time[i] <= hi)
        .collect();

    let smoothed_at: Vec<(usize, f64)> = qualifying
        .par_iter()
        .map(|&i| {
            let t0 = time[i];
            // window membership is judged among qualifying samples only
            let in_window: Vec<usize> = qualifying
                .iter()
                .cloned()
                .filter(|&j| time[j] >= t0 - half && time[j] <= t0 + half)
                .collect();

            let x: Vec<f64> = in_window.iter().map(|&j| time[j]).collect();
            let y: Vec<f64> = in_window.iter().map(|&j| flux[j]).collect();
            let w: Vec<f64> = in_window.iter().map(|&j| 1.0 / error[j]).collect();

            let fit = Polynomial::fit(&x, &y, order, Some(&w));
            (i, fit.eval(t0))
        })
        .collect();

    let mut smo = vec![0.0; n];
    for (i, value) in smoothed_at {
        smo[i] = value;
    }
    Ok(smo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_smooth_polynomial_signal() {
        let time: Vec<f64> = (0..200).map(|i| i as f64 * 0.01).collect();
        let flux: Vec<f64> = time.iter().map(|&t| 10.0 + 2.0 * t - 0.5 * t * t).collect();
        let error = vec![0.1; time.len()];

        let smo = rolling_poly(&time, &flux, &error, 2, 0.3).unwrap();

        // away from the excluded leading edge, the local quadratic fit must
        // reproduce an exactly quadratic signal
        for i in 50..200 {
            assert_relative_eq!(smo[i], flux[i], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_leading_edge_stays_zero() {
        let time: Vec<f64> = (0..100).map(|i| i as f64 * 0.01).collect();
        let flux = vec![5.0; 100];
        let error = vec![0.1; 100];

        let smo = rolling_poly(&time, &flux, &error, 1, 0.5).unwrap();

        // samples before time[0] + window/2 = 0.25 are left untouched
        for i in 0..25 {
            assert_eq!(smo[i], 0.0, "sample {} inside excluded edge", i);
        }
        assert_relative_eq!(smo[50], 5.0, epsilon = 1e-8);
        // asymmetric boundary policy: the trailing edge still qualifies
        assert_relative_eq!(smo[99], 5.0, epsilon = 1e-8);
    }

    #[test]
    fn test_output_length_matches_input() {
        let time: Vec<f64> = (0..40).map(|i| i as f64 * 0.05).collect();
        let flux = vec![1.0; 40];
        let error = vec![0.1; 40];
        let smo = rolling_poly(&time, &flux, &error, 3, 0.4).unwrap();
        assert_eq!(smo.len(), 40);
    }

    #[test]
    fn test_invalid_window_rejected() {
        assert!(rolling_poly(&[0.0], &[1.0], &[0.1], 3, 0.0).is_err());
    }
}
