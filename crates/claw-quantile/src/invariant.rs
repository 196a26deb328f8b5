//! Error-bound policies for compressed sample lists.
//!
//! An invariant decides how much rank uncertainty may be tolerated at a given
//! rank `r` of a stream holding `n` observations. Compression is allowed to
//! fold entries together as long as the result stays within this bound.

use crate::sample::QuantileEpsilonPair;

/// The error-bound policy of a [`SampleStream`](crate::SampleStream).
#[derive(Debug, Clone, PartialEq)]
pub enum Invariant {
    /// Tighter error near low ranks: `2·ε·r`.
    LowBiased {
        /// Relative error.
        epsilon: f64,
    },
    /// Tighter error near high ranks: `2·ε·(n−r)`.
    HighBiased {
        /// Relative error.
        epsilon: f64,
    },
    /// The tightest bound satisfying every target simultaneously.
    Targeted(Vec<QuantileEpsilonPair>),
}

impl Invariant {
    /// Returns the maximum delta tolerable at rank `r` of a stream of `n` observations.
    ///
    /// A targeted invariant without targets does not constrain compression.
    #[must_use]
    pub fn allowed(&self, n: f64, r: f64) -> f64 {
        match self {
            Self::LowBiased { epsilon } => 2.0 * epsilon * r,
            Self::HighBiased { epsilon } => 2.0 * epsilon * (n - r),
            Self::Targeted(targets) => targets
                .iter()
                .map(|target| {
                    let (q, e) = (target.quantile(), target.epsilon());
                    if q * n <= r {
                        2.0 * e * r / q
                    } else {
                        2.0 * e * (n - r) / (1.0 - q)
                    }
                })
                .fold(f64::MAX, f64::min),
        }
    }
}
