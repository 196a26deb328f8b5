//! Compressed sample entries and quantile objectives.
//!
//! - [`Sample`]: one entry of a compressed sample list
//! - [`QuantileEpsilonPair`]: a target quantile and its tolerated rank error

use serde::{Deserialize, Serialize};

use crate::error::{QuantileError, Result};

/// One entry of a compressed sample list.
///
/// `width` is the number of original observations the entry stands for and
/// `delta` bounds the rank uncertainty introduced when it was inserted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// The observed value.
    pub value: f64,
    /// Number of observations represented by this entry.
    pub width: u64,
    /// Upper bound on the rank error of this entry.
    pub delta: u64,
}

impl Sample {
    /// Creates a new sample.
    #[must_use]
    pub const fn new(value: f64, width: u64, delta: u64) -> Self {
        Self {
            value,
            width,
            delta,
        }
    }

    /// Creates a sample standing for a single raw observation.
    #[must_use]
    pub const fn single(value: f64) -> Self {
        Self::new(value, 1, 0)
    }
}

/// A target quantile together with its tolerated absolute rank error.
///
/// Serialized as a two element array `[quantile, epsilon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct QuantileEpsilonPair {
    quantile: f64,
    epsilon: f64,
}

/// Objectives used by summaries unless configured otherwise.
pub const DEFAULT_OBJECTIVES: [QuantileEpsilonPair; 4] = [
    QuantileEpsilonPair::from_parts(0.5, 0.05),
    QuantileEpsilonPair::from_parts(0.9, 0.05),
    QuantileEpsilonPair::from_parts(0.95, 0.01),
    QuantileEpsilonPair::from_parts(0.99, 0.01),
];

impl QuantileEpsilonPair {
    /// Creates a validated objective.
    ///
    /// # Errors
    ///
    /// Returns `QuantileError::InvalidObjective` unless both values lie in (0, 1).
    pub fn new(quantile: f64, epsilon: f64) -> Result<Self> {
        let in_range = |v: f64| v > 0.0 && v < 1.0;
        if !in_range(quantile) || !in_range(epsilon) {
            return Err(QuantileError::InvalidObjective { quantile, epsilon });
        }
        Ok(Self::from_parts(quantile, epsilon))
    }

    const fn from_parts(quantile: f64, epsilon: f64) -> Self {
        Self { quantile, epsilon }
    }

    /// Returns the target quantile.
    #[must_use]
    pub const fn quantile(&self) -> f64 {
        self.quantile
    }

    /// Returns the tolerated rank error.
    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl TryFrom<(f64, f64)> for QuantileEpsilonPair {
    type Error = QuantileError;

    fn try_from((quantile, epsilon): (f64, f64)) -> Result<Self> {
        Self::new(quantile, epsilon)
    }
}

impl From<QuantileEpsilonPair> for (f64, f64) {
    fn from(pair: QuantileEpsilonPair) -> Self {
        (pair.quantile, pair.epsilon)
    }
}
