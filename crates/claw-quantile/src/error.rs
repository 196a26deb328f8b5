//! Error types for the claw-quantile crate.

use thiserror::Error;

/// Errors that can occur when configuring a quantile estimator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantileError {
    /// A quantile objective lies outside the open interval (0, 1).
    #[error("invalid objective: quantile={quantile}, epsilon={epsilon} (both must be in (0, 1))")]
    InvalidObjective {
        /// The requested quantile.
        quantile: f64,
        /// The tolerated rank error.
        epsilon: f64,
    },
}

/// Result type for quantile operations.
pub type Result<T> = std::result::Result<T, QuantileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_objective() {
        let err = QuantileError::InvalidObjective {
            quantile: 1.5,
            epsilon: 0.01,
        };
        assert_eq!(
            err.to_string(),
            "invalid objective: quantile=1.5, epsilon=0.01 (both must be in (0, 1))"
        );
    }
}
