//! Numerical primitives backing the detrending components.
//!
//! This module collects the narrow numerical contracts the toolchain is built
//! on: weighted polynomial least squares, rolling medians with boundary
//! fill, a generalized Lomb-Scargle power estimator over an explicit frequency
//! grid, and a Levenberg-Marquardt curve fitter, plus the small order
//! statistics and interpolation helpers shared by the components.
//!
//! Conventions:
//! - Order statistics (`median`, `percentile`) use linear interpolation
//!   between ranks.
//! - `rolling_median` marks positions where the window cannot be fully formed
//!   with NaN rather than shrinking the window.
//! - `interp` clamps to the first/last sample outside the abscissa range.

use nalgebra::{DMatrix, DVector};

/// A polynomial fitted by least squares.
///
/// The abscissa is normalized to `[0, 1]` internally for conditioning, so the
/// stored coefficients are in the normalized basis; use [`Polynomial::eval`]
/// to evaluate at original-scale positions.
#[derive(Debug, Clone)]
pub struct Polynomial {
    /// Coefficients in ascending degree order, normalized basis.
    coeffs: Vec<f64>,
    t_min: f64,
    t_range: f64,
}

impl Polynomial {
    /// Fit a degree-`degree` polynomial to `(x, y)` by least squares.
    ///
    /// With `weights` present, both the design rows and the response are
    /// scaled by the weight, so the objective is `sum (w_i (y_i - p(x_i)))^2`
    /// and `w = 1/error` gives the usual inverse-error weighting.
    ///
    /// Degenerate input (too few points, rank-deficient design) produces
    /// whatever the SVD least-squares solve yields, down to an all-zero
    /// polynomial for empty input. That mirrors the reference pipeline,
    /// which lets near-empty segment fits propagate.
    pub fn fit(x: &[f64], y: &[f64], degree: usize, weights: Option<&[f64]>) -> Polynomial {
        let n = x.len();
        let n_coef = degree + 1;
        if n == 0 || y.len() != n {
            return Polynomial {
                coeffs: vec![0.0; n_coef],
                t_min: 0.0,
                t_range: 1.0,
            };
        }

        let t_min = x.iter().cloned().fold(f64::INFINITY, f64::min);
        let t_max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let t_range = if (t_max - t_min).abs() > 1e-15 {
            t_max - t_min
        } else {
            1.0
        };

        let mut design = DMatrix::zeros(n, n_coef);
        let mut rhs = DVector::zeros(n);
        for i in 0..n {
            let w = weights.map_or(1.0, |ws| ws[i]);
            let u = (x[i] - t_min) / t_range;
            let mut power = 1.0;
            for k in 0..n_coef {
                design[(i, k)] = w * power;
                power *= u;
            }
            rhs[i] = w * y[i];
        }

        let svd = design.svd(true, true);
        let beta = svd
            .solve(&rhs, 1e-12)
            .unwrap_or_else(|_| DVector::zeros(n_coef));

        Polynomial {
            coeffs: beta.iter().cloned().collect(),
            t_min,
            t_range,
        }
    }

    /// Evaluate the polynomial at a single point.
    pub fn eval(&self, x: f64) -> f64 {
        let u = (x - self.t_min) / self.t_range;
        // Horner in the normalized variable
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * u + c)
    }

    /// Evaluate the polynomial at many points.
    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}

/// Median of a slice. Returns NaN for empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Percentile (0-100) with linear interpolation between ranks.
///
/// Returns NaN for empty input.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = rank - lo as f64;
    if lo + 1 >= n {
        sorted[n - 1]
    } else {
        sorted[lo] * (1.0 - frac) + sorted[lo + 1] * frac
    }
}

/// Population standard deviation ignoring non-finite values.
///
/// Returns NaN when no finite value remains.
pub fn nan_std(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().cloned().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let var = finite.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Rolling median over a fixed sample-count window.
///
/// `centered == false` uses a trailing window ending at each position;
/// `centered == true` uses a window spanning `[i - (window-1)/2, i + window/2]`.
/// Positions where the window cannot be fully formed are NaN.
pub fn rolling_median(values: &[f64], window: usize, centered: bool) -> Vec<f64> {
    let n = values.len();
    if window == 0 || window > n {
        return vec![f64::NAN; n];
    }
    let mut out = vec![f64::NAN; n];
    for i in 0..n {
        let (lo, hi) = if centered {
            let half_lo = (window - 1) / 2;
            let half_hi = window / 2;
            if i < half_lo || i + half_hi >= n {
                continue;
            }
            (i - half_lo, i + half_hi)
        } else {
            if i + 1 < window {
                continue;
            }
            (i + 1 - window, i)
        };
        out[i] = median(&values[lo..=hi]);
    }
    out
}

/// Piecewise-linear interpolation of `(xp, fp)` at each point of `x_new`,
/// clamping to the boundary values outside the sampled range.
///
/// `xp` must be sorted ascending. Empty `xp` yields NaN everywhere (the
/// degenerate all-points-rejected case, a documented precondition violation
/// upstream).
pub fn interp(x_new: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    if xp.is_empty() || fp.len() != xp.len() {
        return vec![f64::NAN; x_new.len()];
    }
    x_new
        .iter()
        .map(|&t| {
            if t <= xp[0] {
                return fp[0];
            }
            if t >= xp[xp.len() - 1] {
                return fp[fp.len() - 1];
            }
            let idx = xp.partition_point(|&x| x <= t);
            let t0 = xp[idx - 1];
            let t1 = xp[idx];
            let f0 = fp[idx - 1];
            let f1 = fp[idx];
            f0 + (f1 - f0) * (t - t0) / (t1 - t0)
        })
        .collect()
}

/// Generalized (inverse-variance weighted) Lomb-Scargle power over an
/// explicit frequency grid.
///
/// Follows Scargle (1982) with the phase shift tau making the sine and cosine
/// terms orthogonal, extended with per-point weights `1/error^2`. Power is
/// normalized to `[0, 1]` as the fraction of weighted variance explained at
/// each frequency, so a noiseless sinusoid scores near 1 and white noise
/// scores near 0 regardless of sample count.
pub fn lomb_scargle_power(time: &[f64], flux: &[f64], error: &[f64], freqs: &[f64]) -> Vec<f64> {
    let n = time.len();
    if n < 3 || flux.len() != n || error.len() != n {
        return vec![0.0; freqs.len()];
    }

    let weights: Vec<f64> = error.iter().map(|&e| 1.0 / (e * e)).collect();
    let w_sum: f64 = weights.iter().sum();
    let mean_y: f64 = weights
        .iter()
        .zip(flux)
        .map(|(&w, &y)| w * y)
        .sum::<f64>()
        / w_sum;
    let var_y: f64 = weights
        .iter()
        .zip(flux)
        .map(|(&w, &y)| w * (y - mean_y).powi(2))
        .sum();
    if var_y <= 0.0 {
        return vec![0.0; freqs.len()];
    }

    freqs
        .iter()
        .map(|&freq| {
            let omega = 2.0 * std::f64::consts::PI * freq;
            if omega <= 0.0 {
                return 0.0;
            }

            let mut sum_sin2 = 0.0;
            let mut sum_cos2 = 0.0;
            for (&t, &w) in time.iter().zip(&weights) {
                let arg = 2.0 * omega * t;
                sum_sin2 += w * arg.sin();
                sum_cos2 += w * arg.cos();
            }
            let tau = sum_sin2.atan2(sum_cos2) / (2.0 * omega);

            let mut sc = 0.0;
            let mut ss = 0.0;
            let mut css = 0.0;
            let mut sss = 0.0;
            for i in 0..n {
                let y_centered = flux[i] - mean_y;
                let arg = omega * (time[i] - tau);
                let c = arg.cos();
                let s = arg.sin();
                sc += weights[i] * y_centered * c;
                ss += weights[i] * y_centered * s;
                css += weights[i] * c * c;
                sss += weights[i] * s * s;
            }
            let css = css.max(1e-15);
            let sss = sss.max(1e-15);

            ((sc * sc / css + ss * ss / sss) / var_y).clamp(0.0, 1.0)
        })
        .collect()
}

/// Outcome of a nonlinear least-squares fit.
///
/// Non-convergence is a value, not an exception: callers branch on it and
/// decide the fallback themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    /// The fit converged; carries the fitted parameter vector.
    Converged(Vec<f64>),
    /// The fit did not converge within the iteration budget.
    Failed,
}

const LM_MAX_ITER: usize = 200;
const LM_LAMBDA_MAX: f64 = 1e12;

/// Levenberg-Marquardt nonlinear least squares.
///
/// `model(params, x)` evaluates the model at one abscissa. The Jacobian is
/// formed by forward differences. Once the damping parameter saturates with
/// no downhill step left, the current point is a numerical minimum and is
/// reported as converged; [`FitOutcome::Failed`] means the fit never moved
/// off the initial guess or exhausted its iteration budget without the sum
/// of squared residuals stabilizing.
pub fn curve_fit<F>(model: F, x: &[f64], y: &[f64], p0: &[f64]) -> FitOutcome
where
    F: Fn(&[f64], f64) -> f64,
{
    let n = x.len();
    let n_par = p0.len();
    if n < n_par || n_par == 0 || y.len() != n {
        return FitOutcome::Failed;
    }

    let residuals = |p: &[f64]| -> Vec<f64> {
        x.iter().zip(y).map(|(&xi, &yi)| yi - model(p, xi)).collect()
    };
    let ssr_of = |r: &[f64]| -> f64 { r.iter().map(|&v| v * v).sum() };

    let mut params = p0.to_vec();
    let mut res = residuals(&params);
    let mut ssr = ssr_of(&res);
    if !ssr.is_finite() {
        return FitOutcome::Failed;
    }

    let mut lambda = 1e-3;
    let mut moved = false;

    for _ in 0..LM_MAX_ITER {
        // Forward-difference Jacobian of the residual vector
        let mut jac = DMatrix::zeros(n, n_par);
        for k in 0..n_par {
            let step = 1e-8 * params[k].abs().max(1.0);
            let mut p_step = params.clone();
            p_step[k] += step;
            let res_step = residuals(&p_step);
            for i in 0..n {
                jac[(i, k)] = (res_step[i] - res[i]) / step;
            }
        }

        let r_vec = DVector::from_row_slice(&res);
        let jtj = jac.transpose() * &jac;
        let jtr = jac.transpose() * r_vec;

        // Inner damping loop: inflate lambda until a step reduces the SSR
        let mut improved = false;
        while lambda <= LM_LAMBDA_MAX {
            let mut damped = jtj.clone();
            for k in 0..n_par {
                damped[(k, k)] += lambda * jtj[(k, k)].max(1e-12);
            }

            let delta = match damped.lu().solve(&jtr) {
                Some(d) => d,
                None => {
                    lambda *= 10.0;
                    continue;
                }
            };

            // Jacobian of residuals is -d(model)/d(p), so step against it
            let trial: Vec<f64> = params
                .iter()
                .zip(delta.iter())
                .map(|(&p, &d)| p - d)
                .collect();
            let trial_res = residuals(&trial);
            let trial_ssr = ssr_of(&trial_res);

            if trial_ssr.is_finite() && trial_ssr < ssr {
                let converged = ssr - trial_ssr < 1e-12 * (ssr + 1e-30)
                    || delta.iter().all(|&d| d.abs() < 1e-12);
                params = trial;
                res = trial_res;
                ssr = trial_ssr;
                lambda = (lambda / 10.0).max(1e-12);
                improved = true;
                moved = true;
                if converged {
                    return FitOutcome::Converged(params);
                }
                break;
            }
            lambda *= 10.0;
        }

        if !improved {
            // Damping saturated with no downhill step left: a numerical
            // minimum if the fit ever moved, a dead start otherwise.
            return if moved {
                FitOutcome::Converged(params)
            } else {
                FitOutcome::Failed
            };
        }
    }

    FitOutcome::Failed
}
