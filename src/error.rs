//! Error types and shared input validation for the detrending toolchain.
//!
//! The reference pipeline left malformed input as undefined behavior; here the
//! public entry points validate their preconditions up front and fail fast.
//! Purely numerical degeneracies (near-empty segments, non-converging sinusoid
//! fits) are still handled locally and never surface as errors.

use thiserror::Error;

/// Error returned by the public detrending entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetrendError {
    /// Input series is empty.
    #[error("input light curve is empty")]
    EmptyInput,

    /// Parallel input arrays disagree in length.
    #[error("mismatched input lengths: time has {time_len}, {name} has {other_len}")]
    MismatchedLengths {
        /// Length of the `time` array.
        time_len: usize,
        /// Name of the offending companion array.
        name: &'static str,
        /// Length of the companion array.
        other_len: usize,
    },

    /// Measurement errors must be strictly positive.
    #[error("non-positive measurement error at index {index}: {value}")]
    NonPositiveError {
        /// Index of the offending sample.
        index: usize,
        /// The offending error value.
        value: f64,
    },

    /// A tuning parameter is outside its valid range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Validate a bare (time, flux) pair.
pub(crate) fn check_time_flux(time: &[f64], flux: &[f64]) -> Result<(), DetrendError> {
    if time.is_empty() {
        return Err(DetrendError::EmptyInput);
    }
    if flux.len() != time.len() {
        return Err(DetrendError::MismatchedLengths {
            time_len: time.len(),
            name: "flux",
            other_len: flux.len(),
        });
    }
    Ok(())
}

/// Validate a full (time, flux, error) light curve.
pub(crate) fn check_light_curve(
    time: &[f64],
    flux: &[f64],
    error: &[f64],
) -> Result<(), DetrendError> {
    check_time_flux(time, flux)?;
    if error.len() != time.len() {
        return Err(DetrendError::MismatchedLengths {
            time_len: time.len(),
            name: "error",
            other_len: error.len(),
        });
    }
    if let Some((index, &value)) = error.iter().enumerate().find(|(_, &e)| !(e > 0.0)) {
        return Err(DetrendError::NonPositiveError { index, value });
    }
    Ok(())
}

/// Reject a non-positive tuning parameter.
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<(), DetrendError> {
    if !(value > 0.0) {
        return Err(DetrendError::InvalidParameter {
            name,
            reason: format!("must be positive, got {}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(check_time_flux(&[], &[]), Err(DetrendError::EmptyInput));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = check_time_flux(&[0.0, 1.0], &[1.0]).unwrap_err();
        assert_eq!(
            err,
            DetrendError::MismatchedLengths {
                time_len: 2,
                name: "flux",
                other_len: 1,
            }
        );
    }

    #[test]
    fn test_non_positive_error_rejected() {
        let err = check_light_curve(&[0.0, 1.0], &[1.0, 1.0], &[0.1, 0.0]).unwrap_err();
        assert_eq!(
            err,
            DetrendError::NonPositiveError {
                index: 1,
                value: 0.0,
            }
        );
    }

    #[test]
    fn test_nan_error_rejected() {
        assert!(check_light_curve(&[0.0], &[1.0], &[f64::NAN]).is_err());
    }

    #[test]
    fn test_valid_light_curve_accepted() {
        assert!(check_light_curve(&[0.0, 1.0], &[1.0, 2.0], &[0.1, 0.1]).is_ok());
    }
}
