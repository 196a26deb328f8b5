//! Core types shared by every metric.
//!
//! - [`MetricName`]: A validated metric name
//! - [`MetricKind`]: The exposition type of a metric

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// A validated metric name.
///
/// Metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`:
/// - Be non-empty
/// - Start with a letter, underscore or colon
/// - Contain only alphanumeric characters, underscores, and colons
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetricName(String);

impl MetricName {
    /// Creates a new validated metric name.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidMetricName` if the name is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        let Some(first) = name.chars().next() else {
            return Err(MetricsError::InvalidMetricName {
                reason: "metric name cannot be empty".to_string(),
            });
        };

        if !first.is_ascii_alphabetic() && first != '_' && first != ':' {
            return Err(MetricsError::InvalidMetricName {
                reason: format!(
                    "metric name must start with a letter, underscore or colon, got '{first}'"
                ),
            });
        }

        if let Some(c) = name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != ':')
        {
            return Err(MetricsError::InvalidMetricName {
                reason: format!("invalid character '{c}' in metric name"),
            });
        }

        Ok(Self(name))
    }

    /// Returns the metric name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `MetricName` and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MetricName {
    type Error = MetricsError;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

impl From<MetricName> for String {
    fn from(name: MetricName) -> Self {
        name.0
    }
}

/// The exposition type of a metric, as written in its `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing value.
    Counter,
    /// Value that can go up and down.
    Gauge,
    /// Bucketed distribution.
    Histogram,
    /// Windowed quantile estimates.
    Summary,
}

impl MetricKind {
    /// Returns the name used in the exposition format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
