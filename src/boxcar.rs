//! Iterative outlier-rejecting boxcar smoothing.
//!
//! Per segment, the flux is repeatedly rolling-median smoothed and clipped:
//! a point survives a pass when its residual against the smoothed curve is
//! small relative to its measurement error *or* falls inside a central
//! percentile band of the residual distribution. After the passes, a smoothed
//! curve is reconstructed at every original timestamp by linear interpolation
//! over the survivors.

use crate::error::{check_light_curve, check_positive, DetrendError};
use crate::gaps::{find_gaps, DEFAULT_MINSPAN};
use crate::numeric::{interp, median, percentile, rolling_median};
use log::debug;

/// Reference number of rejection passes.
pub const DEFAULT_NUMPASS: usize = 3;
/// Reference boxcar width in hours.
pub const DEFAULT_KERNEL: f64 = 2.0;
/// Reference error-normalized residual threshold.
pub const DEFAULT_SIGCLIP: f64 = 5.0;
/// Reference symmetric percentile threshold.
pub const DEFAULT_PCENTCLIP: f64 = 5.0;

/// Working copy of one segment across rejection passes.
struct Survivors {
    time: Vec<f64>,
    flux: Vec<f64>,
    error: Vec<f64>,
    /// Original full-series index of each surviving sample.
    index: Vec<usize>,
}

/// Convert the boxcar width from hours to a sample count for this segment's
/// cadence, floored at 4 samples.
fn smoothing_points(time: &[f64], kernel_hours: f64) -> usize {
    let dts: Vec<f64> = time.windows(2).map(|w| w[1] - w[0]).collect();
    let cadence = median(&dts);
    let npt = if cadence.is_finite() && cadence > 0.0 {
        (kernel_hours / 24.0 / cadence) as usize
    } else {
        0
    };
    npt.max(4)
}

/// Run the rejection passes for one segment. Each pass produces fresh arrays;
/// nothing is mutated in place across passes.
fn clean_segment(
    seg: Survivors,
    numpass: usize,
    nptsmooth: usize,
    sigclip: f64,
    pcentclip: f64,
) -> Survivors {
    let mut cur = seg;
    for pass in 0..numpass {
        let smoothed = rolling_median(&cur.flux, nptsmooth, true);

        // residuals where the centered window could be formed
        let mut diff = Vec::new();
        let mut kept: Vec<usize> = Vec::new();
        for (k, &sm) in smoothed.iter().enumerate() {
            if sm.is_finite() {
                diff.push(cur.flux[k] - sm);
                kept.push(k);
            }
        }

        let lo = percentile(&diff, pcentclip);
        let hi = percentile(&diff, 100.0 - pcentclip);

        let mut next = Survivors {
            time: Vec::new(),
            flux: Vec::new(),
            error: Vec::new(),
            index: Vec::new(),
        };
        for (d_pos, &k) in kept.iter().enumerate() {
            let d = diff[d_pos];
            let within_sig = (d / cur.error[k]).abs() < sigclip;
            let within_pcent = lo < d && d < hi;
            if within_sig || within_pcent {
                next.time.push(cur.time[k]);
                next.flux.push(cur.flux[k]);
                next.error.push(cur.error[k]);
                next.index.push(cur.index[k]);
            }
        }
        debug!("pass {}: {} -> {} points", pass, cur.time.len(), next.time.len());
        cur = next;
    }
    cur
}

fn boxcar_segments(
    time: &[f64],
    flux: &[f64],
    error: &[f64],
    maxgap: f64,
    numpass: usize,
    kernel_hours: f64,
    sigclip: f64,
    pcentclip: f64,
) -> Result<(Vec<f64>, Vec<usize>), DetrendError> {
    check_light_curve(time, flux, error)?;
    check_positive("kernel", kernel_hours)?;
    let segments = find_gaps(time, maxgap, DEFAULT_MINSPAN)?;

    let mut flux_sm = flux.to_vec();
    let mut indx_out = Vec::new();

    for (left, right) in segments.iter() {
        let nptsmooth = smoothing_points(&time[left..right], kernel_hours);
        debug!(
            "segment [{}, {}): smoothing over {} points",
            left, right, nptsmooth
        );

        let seg = Survivors {
            time: time[left..right].to_vec(),
            flux: flux[left..right].to_vec(),
            error: error[left..right].to_vec(),
            index: (left..right).collect(),
        };
        let survivors = clean_segment(seg, numpass, nptsmooth, sigclip, pcentclip);

        let rebuilt = interp(&time[left..right], &survivors.time, &survivors.flux);
        flux_sm[left..right].copy_from_slice(&rebuilt);
        indx_out.extend_from_slice(&survivors.index);
    }

    Ok((flux_sm, indx_out))
}

/// Iteratively clean and smooth a light curve segment by segment.
///
/// Returns the reconstructed smoothed flux, aligned one-to-one with the
/// input. A segment where every point is rejected reconstructs to NaN — an
/// over-aggressive parameterization is a precondition violation, not a
/// recoverable state.
#[allow(clippy::too_many_arguments)]
pub fn multi_boxcar(
    time: &[f64],
    flux: &[f64],
    error: &[f64],
    maxgap: f64,
    numpass: usize,
    kernel_hours: f64,
    sigclip: f64,
    pcentclip: f64,
) -> Result<Vec<f64>, DetrendError> {
    boxcar_segments(
        time, flux, error, maxgap, numpass, kernel_hours, sigclip, pcentclip,
    )
    .map(|(flux_sm, _)| flux_sm)
}

/// Diagnostic variant of [`multi_boxcar`]: returns the original indices of
/// every sample that survived rejection, concatenated across segments in
/// ascending segment order.
#[allow(clippy::too_many_arguments)]
pub fn multi_boxcar_indices(
    time: &[f64],
    flux: &[f64],
    error: &[f64],
    maxgap: f64,
    numpass: usize,
    kernel_hours: f64,
    sigclip: f64,
    pcentclip: f64,
) -> Result<Vec<usize>, DetrendError> {
    boxcar_segments(
        time, flux, error, maxgap, numpass, kernel_hours, sigclip, pcentclip,
    )
    .map(|(_, indx)| indx)
}
