//! Iterative detection and removal of periodic stellar signals.
//!
//! Per segment, a Lomb-Scargle search over a fixed period grid proposes a
//! candidate period; if the peak power is significant, a sinusoid is fitted
//! to the current residual and subtracted, and the search repeats on what
//! remains. The accumulated sinusoids (plus the segment's median flux) are
//! returned, so callers subtract the result from the raw flux to flatten it.

use crate::error::{check_light_curve, check_positive, DetrendError};
use crate::gaps::{find_gaps, DEFAULT_MINSPAN};
use crate::numeric::{curve_fit, lomb_scargle_power, median, nan_std, FitOutcome};
use log::debug;

/// Reference maximum number of sinusoid components per segment.
pub const DEFAULT_MAXNUM: usize = 5;
/// Reference period grid resolution.
pub const DEFAULT_NPER: usize = 20000;
/// Reference shortest trial period in days.
pub const DEFAULT_MINPER: f64 = 0.1;
/// Reference longest trial period in days.
pub const DEFAULT_MAXPER: f64 = 30.0;
/// Reference periodogram power significance threshold.
pub const DEFAULT_PLIM: f64 = 0.1;

/// Sinusoid model: `amp * sin(2 pi (t - t0) / per) + yoff`.
///
/// Parameter order: `[per, amp, t0, yoff]`.
fn sin_model(p: &[f64], t: f64) -> f64 {
    ((t - p[2]) * 2.0 * std::f64::consts::PI / p[0]).sin() * p[1] + p[3]
}

/// Detect and remove up to `maxnum` sinusoids per segment.
///
/// The period grid is `nper` evenly spaced frequencies from `1/maxper` to
/// `1/minper`. Candidate periods are restricted to lie strictly between
/// `minper` and the segment's time baseline; the significance score is the
/// maximum power of the full, unrestricted grid. A non-converging sinusoid
/// fit falls back to zero amplitude at the candidate period, leaving the
/// residual untouched for that iteration. All `maxnum` iterations run even
/// when no significant peak remains.
///
/// Returns the accumulated periodic component per segment, with each
/// segment's median flux added back, concatenated into a full-length series.
/// This is the modeled signal-plus-baseline, *not* the detrended flux.
#[allow(clippy::too_many_arguments)]
pub fn fit_sin(
    time: &[f64],
    flux: &[f64],
    error: &[f64],
    maxgap: f64,
    maxnum: usize,
    nper: usize,
    minper: f64,
    maxper: f64,
    plim: f64,
) -> Result<Vec<f64>, DetrendError> {
    check_light_curve(time, flux, error)?;
    check_positive("minper", minper)?;
    if maxper <= minper {
        return Err(DetrendError::InvalidParameter {
            name: "maxper",
            reason: format!("must exceed minper ({}), got {}", minper, maxper),
        });
    }
    if nper == 0 {
        return Err(DetrendError::InvalidParameter {
            name: "nper",
            reason: "must be at least 1".to_string(),
        });
    }

    let segments = find_gaps(time, maxgap, DEFAULT_MINSPAN)?;

    let f0 = 1.0 / maxper;
    let df = (1.0 / minper - 1.0 / maxper) / nper as f64;
    let freqs: Vec<f64> = (0..nper).map(|i| f0 + df * i as f64).collect();
    let periods: Vec<f64> = freqs.iter().map(|&f| 1.0 / f).collect();

    let mut flux_out = flux.to_vec();
    let mut sin_out = vec![0.0; flux.len()];

    for (left, right) in segments.iter() {
        let ti = &time[left..right];
        let dt = time[right - 1] - time[left];
        let medflux = median(&flux[left..right]);
        debug!("segment [{}, {}): baseline {} days", left, right, dt);

        for trial in 0..maxnum {
            let centered: Vec<f64> = flux_out[left..right].iter().map(|&f| f - medflux).collect();
            let power = lomb_scargle_power(ti, &centered, &error[left..right], &freqs);

            // candidate periods must be resolvable within this segment
            let candidate = power
                .iter()
                .enumerate()
                .filter(|(j, _)| periods[*j] < dt && periods[*j] > minper)
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(j, _)| periods[j]);
            let peak_power = power.iter().cloned().fold(0.0f64, f64::max);

            debug!(
                "trial {}: peak period {:?}, peak power {}",
                trial, candidate, peak_power
            );

            if peak_power > plim {
                let pk = match candidate {
                    Some(pk) => pk,
                    // baseline too short to constrain any trial period;
                    // the iteration is consumed with no change
                    None => continue,
                };

                let guess = [pk, 3.0 * nan_std(&centered), 0.0, 0.0];
                let params = match curve_fit(sin_model, ti, &centered, &guess) {
                    FitOutcome::Converged(p) => p,
                    FitOutcome::Failed => {
                        debug!("sinusoid fit failed at period {}, zero-amplitude fallback", pk);
                        vec![pk, 0.0, 0.0, 0.0]
                    }
                };

                for (k, &t) in ti.iter().enumerate() {
                    let value = sin_model(&params, t);
                    flux_out[left + k] -= value;
                    sin_out[left + k] += value;
                }
            }
            // an insignificant peak does not break the loop; all maxnum
            // trials are consumed either way
        }

        for s in sin_out[left..right].iter_mut() {
            *s += medflux;
        }
    }

    Ok(sin_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaps::DEFAULT_MAXGAP;
    use crate::numeric::nan_std;
    use rand::prelude::*;
    use rand_distr::Normal;
    use std::f64::consts::PI;

    fn sine_curve(n: usize, span: f64, period: f64, amp: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let time: Vec<f64> = (0..n).map(|i| i as f64 * span / (n - 1) as f64).collect();
        let flux: Vec<f64> = time
            .iter()
            .map(|&t| 100.0 + amp * (2.0 * PI * t / period).sin())
            .collect();
        let error = vec![0.1; n];
        (time, flux, error)
    }

    #[test]
    fn test_recovers_seven_day_period_and_flattens() {
        let (time, flux, error) = sine_curve(300, 30.0, 7.0, 5.0);

        // dominant periodogram peak must land within 2% of the true period
        let f0 = 1.0 / 15.0;
        let df = (1.0 / 1.0 - 1.0 / 15.0) / 4000.0;
        let freqs: Vec<f64> = (0..4000).map(|i| f0 + df * i as f64).collect();
        let med = crate::numeric::median(&flux);
        let centered: Vec<f64> = flux.iter().map(|&f| f - med).collect();
        let power = lomb_scargle_power(&time, &centered, &error, &freqs);
        let best = power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(j, _)| j)
            .unwrap();
        let peak_period = 1.0 / freqs[best];
        assert!(
            (peak_period - 7.0).abs() / 7.0 < 0.02,
            "peak period {} not within 2% of 7 days",
            peak_period
        );

        let periodic = fit_sin(
            &time, &flux, &error, DEFAULT_MAXGAP, 3, 4000, 1.0, 15.0, 0.05,
        )
        .unwrap();

        let residual: Vec<f64> = flux.iter().zip(&periodic).map(|(&f, &s)| f - s).collect();
        let resid_std = nan_std(&residual);
        assert!(resid_std < 0.5, "residual std {} above noise floor", resid_std);
    }

    #[test]
    fn test_noisy_sinusoid_is_removed() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::new(0.0, 0.1).unwrap();
        let (time, clean, error) = sine_curve(300, 30.0, 7.0, 5.0);
        let flux: Vec<f64> = clean.iter().map(|&f| f + noise.sample(&mut rng)).collect();

        let periodic = fit_sin(
            &time, &flux, &error, DEFAULT_MAXGAP, 3, 4000, 1.0, 15.0, 0.05,
        )
        .unwrap();

        let residual: Vec<f64> = flux.iter().zip(&periodic).map(|(&f, &s)| f - s).collect();
        assert!(nan_std(&residual) < 0.5);
    }

    #[test]
    fn test_no_significant_peak_yields_flat_baseline() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 0.05).unwrap();
        let time: Vec<f64> = (0..200).map(|i| i as f64 * 0.1).collect();
        let flux: Vec<f64> = (0..200).map(|_| 50.0 + noise.sample(&mut rng)).collect();
        let error = vec![0.1; 200];

        // plim high enough that noise never clears it
        let periodic = fit_sin(
            &time, &flux, &error, DEFAULT_MAXGAP, 3, 1000, 1.0, 15.0, 0.9,
        )
        .unwrap();

        let medflux = median(&flux);
        for &s in &periodic {
            assert_eq!(s, medflux, "expected flat median baseline");
        }
    }

    #[test]
    fn test_short_baseline_has_no_candidates() {
        // 0.5-day baseline, every trial period exceeds it
        let time: Vec<f64> = (0..50).map(|i| i as f64 * 0.01).collect();
        let flux: Vec<f64> = time.iter().map(|&t| 10.0 + 4.0 * t).collect();
        let error = vec![0.1; 50];

        let periodic = fit_sin(
            &time, &flux, &error, DEFAULT_MAXGAP, 2, 500, 1.0, 15.0, 0.01,
        )
        .unwrap();

        let medflux = median(&flux);
        for &s in &periodic {
            assert_eq!(s, medflux);
        }
    }

    #[test]
    fn test_each_segment_keeps_its_own_baseline() {
        let mut time = Vec::new();
        let mut flux = Vec::new();
        for i in 0..100 {
            time.push(i as f64 * 0.05);
            flux.push(20.0);
        }
        for i in 0..100 {
            time.push(50.0 + i as f64 * 0.05);
            flux.push(60.0);
        }
        let error = vec![0.1; 200];

        let periodic = fit_sin(
            &time, &flux, &error, DEFAULT_MAXGAP, 2, 500, 1.0, 15.0, 0.1,
        )
        .unwrap();

        assert_eq!(periodic[50], 20.0);
        assert_eq!(periodic[150], 60.0);
    }

    #[test]
    fn test_invalid_period_range_rejected() {
        let time = [0.0, 1.0, 2.0];
        let flux = [1.0, 1.0, 1.0];
        let error = [0.1, 0.1, 0.1];
        assert!(fit_sin(&time, &flux, &error, DEFAULT_MAXGAP, 1, 100, 5.0, 1.0, 0.1).is_err());
    }
}
