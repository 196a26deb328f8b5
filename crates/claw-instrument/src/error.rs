//! Error types for the claw-instrument crate.

use thiserror::Error;

use crate::types::MetricKind;

/// Errors that can occur in the instrumentation system.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The metric name is invalid (empty or contains invalid characters).
    #[error("invalid metric name: {reason}")]
    InvalidMetricName {
        /// The reason the name is invalid.
        reason: String,
    },

    /// Histogram bucket boundaries are empty or not strictly increasing.
    #[error("invalid buckets: {reason}")]
    InvalidBuckets {
        /// The reason the buckets are invalid.
        reason: String,
    },

    /// A summary configuration value is out of range, including an
    /// objective outside (0, 1).
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// A metric is already registered under this name with another type.
    #[error("metric {name} is registered as a {registered}, not a {requested}")]
    TypeMismatch {
        /// The conflicting metric name.
        name: String,
        /// The type already registered.
        registered: MetricKind,
        /// The type that was requested.
        requested: MetricKind,
    },

    /// Collecting process statistics failed.
    #[error("collection error: {reason}")]
    Collection {
        /// The reason the collection failed.
        reason: String,
    },

    /// Writing the exposition failed.
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for instrumentation operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
