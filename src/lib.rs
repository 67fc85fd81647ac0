//! Detrending toolchain for irregularly-sampled astronomical light curves.
//!
//! Removes instrumental and astrophysical trends (long-term drifts, periodic
//! stellar signals) from brightness time series prior to transient and
//! variability analysis. The components are stateless free functions over
//! plain `&[f64]` slices:
//!
//! - [`gaps::find_gaps`] — partition a time series into contiguous
//!   observation windows separated by data gaps.
//! - [`smoothing::rolling_poly`] — weighted polynomial fits in a sliding
//!   time window.
//! - [`flatten::gap_flat`] / [`flatten::qtr_flat`] — per-segment or
//!   per-group polynomial flattening that preserves the global flux level.
//! - [`boxcar::multi_boxcar`] — iterative outlier-rejecting boxcar
//!   smoothing.
//! - [`sinusoid::fit_sin`] — iterative periodic-signal detection and
//!   removal.
//!
//! The components share the segmentation produced by `find_gaps` but are
//! otherwise independent; callers compose them in whatever order suits the
//! data. All functions are synchronous and side-effect-free on their inputs.
//!
//! Numerical building blocks (polynomial least squares, rolling medians,
//! Lomb-Scargle power, Levenberg-Marquardt fitting) live in [`numeric`].
//!
//! ## Example
//!
//! ```
//! use lcdetrend::{find_gaps, fit_sin, gaps, sinusoid};
//!
//! let time: Vec<f64> = (0..300).map(|i| i as f64 * 0.1).collect();
//! let flux: Vec<f64> = time
//!     .iter()
//!     .map(|&t| 100.0 + 5.0 * (2.0 * std::f64::consts::PI * t / 7.0).sin())
//!     .collect();
//! let error = vec![0.1; time.len()];
//!
//! let segments = find_gaps(&time, gaps::DEFAULT_MAXGAP, gaps::DEFAULT_MINSPAN).unwrap();
//! assert_eq!(segments.len(), 1);
//!
//! // model the periodic component, then subtract it to flatten the curve
//! let periodic = fit_sin(
//!     &time,
//!     &flux,
//!     &error,
//!     gaps::DEFAULT_MAXGAP,
//!     sinusoid::DEFAULT_MAXNUM,
//!     2000,
//!     1.0,
//!     15.0,
//!     0.05,
//! )
//! .unwrap();
//! let flat: Vec<f64> = flux.iter().zip(&periodic).map(|(f, s)| f - s).collect();
//! # assert!(flat.iter().all(|v| v.abs() < 1.0));
//! ```

pub mod boxcar;
pub mod error;
pub mod flatten;
pub mod gaps;
pub mod numeric;
pub mod sinusoid;
pub mod smoothing;

pub use boxcar::{multi_boxcar, multi_boxcar_indices};
pub use error::DetrendError;
pub use flatten::{gap_flat, qtr_flat};
pub use gaps::{find_gaps, Segments};
pub use sinusoid::fit_sin;
pub use smoothing::rolling_poly;
