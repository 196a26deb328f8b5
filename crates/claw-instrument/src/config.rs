//! Summary configuration.
//!
//! [`SummaryOpts`] controls the objectives a summary reports and the moving
//! window its quantiles cover. It deserializes from JSON with every field
//! optional, so a config file only needs to name what it changes.

use std::path::Path;
use std::time::Duration;

use claw_quantile::{DEFAULT_OBJECTIVES, QuantileEpsilonPair, SCRATCH_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Default length of the quantile window.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Default number of age buckets the window is split into.
pub const DEFAULT_AGE_BUCKETS: u32 = 5;

/// Default capacity of each raw observation buffer.
pub const DEFAULT_BUF_CAP: usize = SCRATCH_CAPACITY;

/// Options for a summary and each of its windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOpts {
    /// Quantiles to report, each with its tolerated rank error.
    pub objectives: Vec<QuantileEpsilonPair>,
    /// Length of the quantile window. Serialized as fractional seconds.
    #[serde(rename = "max_age_secs", with = "duration_secs")]
    pub max_age: Duration,
    /// Number of buckets the window rotates through.
    pub age_buckets: u32,
    /// Raw observations buffered before they are compressed.
    pub buf_cap: usize,
}

impl Default for SummaryOpts {
    fn default() -> Self {
        Self {
            objectives: DEFAULT_OBJECTIVES.to_vec(),
            max_age: DEFAULT_MAX_AGE,
            age_buckets: DEFAULT_AGE_BUCKETS,
            buf_cap: DEFAULT_BUF_CAP,
        }
    }
}

impl SummaryOpts {
    /// Replaces the objectives.
    #[must_use]
    pub fn with_objectives(mut self, objectives: impl Into<Vec<QuantileEpsilonPair>>) -> Self {
        self.objectives = objectives.into();
        self
    }

    /// Sets the window length.
    #[must_use]
    pub const fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Sets the number of age buckets.
    #[must_use]
    pub const fn with_age_buckets(mut self, age_buckets: u32) -> Self {
        self.age_buckets = age_buckets;
        self
    }

    /// Sets the raw buffer capacity.
    #[must_use]
    pub const fn with_buf_cap(mut self, buf_cap: usize) -> Self {
        self.buf_cap = buf_cap;
        self
    }

    /// Returns the window length.
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Returns how long each age bucket stays at the head of the window.
    ///
    /// Zero if `age_buckets` is zero; [`validate`](Self::validate) rejects that.
    #[must_use]
    pub fn stream_duration(&self) -> Duration {
        self.max_age()
            .checked_div(self.age_buckets)
            .unwrap_or_default()
    }

    /// Load options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            MetricsError::InvalidConfig {
                reason: format!(
                    "failed to read config file '{}': {e}",
                    path.as_ref().display()
                ),
            }
        })?;

        Self::from_json(&content)
    }

    /// Parse options from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or the options fail validation.
    pub fn from_json(content: &str) -> Result<Self> {
        let opts: Self = serde_json::from_str(content).map_err(|e| MetricsError::InvalidConfig {
            reason: format!("invalid JSON: {e}"),
        })?;

        opts.validate()?;
        Ok(opts)
    }

    /// Validate the options.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidConfig` if any window parameter is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_age.is_zero() {
            return Err(MetricsError::InvalidConfig {
                reason: "max_age must be greater than 0".to_string(),
            });
        }

        if self.age_buckets == 0 {
            return Err(MetricsError::InvalidConfig {
                reason: "age_buckets must be greater than 0".to_string(),
            });
        }

        if self.buf_cap == 0 {
            return Err(MetricsError::InvalidConfig {
                reason: "buf_cap must be greater than 0".to_string(),
            });
        }

        if self.stream_duration().is_zero() {
            return Err(MetricsError::InvalidConfig {
                reason: format!(
                    "max_age of {:?} is too short for {} age buckets",
                    self.max_age, self.age_buckets
                ),
            });
        }

        Ok(())
    }

    /// Returns the objectives sorted ascending by quantile.
    pub(crate) fn sorted_objectives(&self) -> Vec<QuantileEpsilonPair> {
        let mut objectives = self.objectives.clone();
        objectives.sort_by(|a, b| a.quantile().total_cmp(&b.quantile()));
        objectives
    }
}

/// Serde adapter for a `Duration` written as (fractional) seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| D::Error::custom(format!("invalid max_age_secs {secs}: {e}")))
    }
}
