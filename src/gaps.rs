//! Gap-aware segmentation of light curves.
//!
//! An observation window ("segment") is a maximal contiguous run of samples
//! with no internal time gap reaching the `maxgap` threshold. Every other
//! component of the toolchain scopes its work to these segments.

use crate::error::{check_positive, DetrendError};
use log::debug;

/// Reference `maxgap` threshold in days.
pub const DEFAULT_MAXGAP: f64 = 0.125;
/// Reference `minspan` value in days (accepted but inert, see [`find_gaps`]).
pub const DEFAULT_MINSPAN: f64 = 3.0;

/// Partition of a light curve into contiguous observation windows.
///
/// Segment `i` covers the index range `[left[i], right[i])`. The segments
/// tile the full series: `left[0] == 0`, `right.last() == n`, and
/// `right[i] == left[i+1]` throughout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    /// Raw gap positions: index `i` means the gap opens after sample `i`.
    pub gaps: Vec<usize>,
    /// Left (inclusive) boundary of each segment.
    pub left: Vec<usize>,
    /// Right (exclusive) boundary of each segment.
    pub right: Vec<usize>,
}

impl Segments {
    /// Number of segments.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether the partition holds no segments (never true for valid input).
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Iterate over `(left, right)` index ranges in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.left.iter().cloned().zip(self.right.iter().cloned())
    }
}

/// Partition `time` into segments separated by gaps of at least `maxgap`.
///
/// `time` must be sorted ascending; unsorted input is a precondition
/// violation and is not validated. A series with no qualifying gap yields a
/// single segment covering the whole range.
///
/// `minspan` is carried from the reference pipeline, where it was accepted
/// but never applied; short segments are neither merged nor dropped here.
/// The knob is kept so call sites stay source-compatible with the reference
/// parameterization.
pub fn find_gaps(time: &[f64], maxgap: f64, minspan: f64) -> Result<Segments, DetrendError> {
    if time.is_empty() {
        return Err(DetrendError::EmptyInput);
    }
    check_positive("maxgap", maxgap)?;
    if (minspan - DEFAULT_MINSPAN).abs() > f64::EPSILON {
        debug!("minspan = {} requested, but minspan is currently inert", minspan);
    }

    let gaps: Vec<usize> = time
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[1] - w[0] >= maxgap)
        .map(|(i, _)| i)
        .collect();

    let mut left = Vec::with_capacity(gaps.len() + 1);
    let mut right = Vec::with_capacity(gaps.len() + 1);
    left.push(0);
    for &g in &gaps {
        left.push(g + 1);
        right.push(g + 1);
    }
    right.push(time.len());

    debug!("found {} gap(s), {} segment(s)", gaps.len(), left.len());
    Ok(Segments { gaps, left, right })
}
