//! Batching front end over a [`SampleStream`].
//!
//! Raw inserts are collected in a scratch list of fixed capacity. Once it
//! fills, or a query needs the compressed view, the list is sorted and merged
//! into the underlying stream in one pass.

use crate::invariant::Invariant;
use crate::sample::{QuantileEpsilonPair, Sample};
use crate::stream::SampleStream;

/// Number of raw samples buffered before they are merged.
pub const SCRATCH_CAPACITY: usize = 500;

/// An approximate quantile estimator over an unbounded stream of values.
#[derive(Debug, Clone)]
pub struct QuantileStream {
    scratch: Vec<Sample>,
    sorted: bool,
    stream: SampleStream,
}

impl QuantileStream {
    /// Creates a stream compressed under the given invariant.
    #[must_use]
    pub fn new(invariant: Invariant) -> Self {
        Self {
            scratch: Vec::with_capacity(SCRATCH_CAPACITY),
            sorted: true,
            stream: SampleStream::new(invariant),
        }
    }

    /// Creates a stream with tighter error near low ranks.
    #[must_use]
    pub fn low_biased(epsilon: f64) -> Self {
        Self::new(Invariant::LowBiased { epsilon })
    }

    /// Creates a stream with tighter error near high ranks.
    #[must_use]
    pub fn high_biased(epsilon: f64) -> Self {
        Self::new(Invariant::HighBiased { epsilon })
    }

    /// Creates a stream honouring every `(quantile, epsilon)` target at once.
    #[must_use]
    pub fn targeted(targets: &[QuantileEpsilonPair]) -> Self {
        Self::new(Invariant::Targeted(targets.to_vec()))
    }

    /// Records one observation.
    pub fn insert(&mut self, value: f64) {
        self.scratch.push(Sample::single(value));
        self.sorted = false;
        if self.scratch.len() >= SCRATCH_CAPACITY {
            self.flush();
        }
    }

    /// Sorts pending observations and merges them into the compressed stream.
    pub fn flush(&mut self) {
        self.maybe_sort();
        self.stream.merge(&self.scratch);
        self.scratch.clear();
    }

    /// Returns the approximate value at quantile `q`.
    ///
    /// Until the first merge the answer comes straight from the sorted scratch
    /// list, which is exact for small sets. An empty stream yields `0.0`.
    pub fn query(&mut self, q: f64) -> f64 {
        if self.stream.is_empty() {
            if self.scratch.is_empty() {
                return 0.0;
            }
            self.maybe_sort();
            let len = self.scratch.len();
            let index = ((len as f64 * q).floor() as usize)
                .saturating_sub(1)
                .min(len - 1);
            return self.scratch[index].value;
        }

        if !self.scratch.is_empty() {
            self.flush();
        }
        self.stream.query(q).unwrap_or(0.0)
    }

    /// Returns the number of observations recorded, merged or pending.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.scratch.len() as u64 + self.stream.count()
    }

    /// Discards every observation.
    pub fn reset(&mut self) {
        self.scratch.clear();
        self.sorted = true;
        self.stream.reset();
    }

    /// Returns the compressed stream behind this estimator.
    #[must_use]
    pub const fn samples(&self) -> &SampleStream {
        &self.stream
    }

    fn maybe_sort(&mut self) {
        if !self.sorted {
            self.scratch
                .sort_unstable_by(|a, b| a.value.total_cmp(&b.value));
            self.sorted = true;
        }
    }
}
