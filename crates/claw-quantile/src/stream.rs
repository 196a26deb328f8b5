//! Compressed, rank-ordered sample list.
//!
//! This module provides the [`SampleStream`] which approximates the whole
//! distribution merged into it. Sorted batches are merged in and redundant
//! samples are compressed out after every batch, so memory stays bounded by
//! the invariant rather than by the number of observations.

use crate::invariant::Invariant;
use crate::sample::Sample;

/// An ε-approximate sketch of every value merged into it.
///
/// Samples are kept sorted ascending by value. For every sample
/// `width + delta` bounds the worst-case rank error at its position.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStream {
    /// Sum of the widths of every sample ever merged.
    n: u64,
    samples: Vec<Sample>,
    invariant: Invariant,
}

impl SampleStream {
    /// Creates an empty stream compressed under the given invariant.
    #[must_use]
    pub const fn new(invariant: Invariant) -> Self {
        Self {
            n: 0,
            samples: Vec::new(),
            invariant,
        }
    }

    /// Merges a batch sorted ascending by value, then compresses.
    pub fn merge(&mut self, batch: &[Sample]) {
        let mut r = 0.0_f64;
        let mut i = 0;

        for incoming in batch {
            let passed = self.samples[i..]
                .iter()
                .take_while(|c| c.value <= incoming.value)
                .count();
            r += self.samples[i..i + passed]
                .iter()
                .map(|c| c.width as f64)
                .sum::<f64>();
            i += passed;

            let delta = if i < self.samples.len() {
                let bound = (self.invariant.allowed(self.n as f64, r).floor() - 1.0).max(0.0);
                incoming.delta.max(bound as u64)
            } else {
                0
            };
            self.samples.insert(i, Sample { delta, ..*incoming });
            i += 1;

            self.n += incoming.width;
            r += incoming.width as f64;
        }

        self.compress();
    }

    /// Folds away samples whose presence the invariant does not require.
    pub fn compress(&mut self) {
        if self.samples.len() < 2 {
            return;
        }

        let n = self.n as f64;
        let mut xi = self.samples.len() - 1;
        let mut r = n - 1.0 - self.samples[xi].width as f64;

        for i in (0..xi).rev() {
            let c = self.samples[i];
            let x = self.samples[xi];

            if (c.width + x.width) as f64 + x.delta as f64 <= self.invariant.allowed(n, r) {
                self.samples[xi].width += c.width;
                self.samples.remove(i);
                xi -= 1;
            } else {
                xi = i;
            }
            r -= c.width as f64;
        }
    }

    /// Returns the approximate value at quantile `q`.
    ///
    /// Returns `None` if nothing has been merged yet.
    #[must_use]
    pub fn query(&self, q: f64) -> Option<f64> {
        let (first, rest) = self.samples.split_first()?;

        let n = self.n as f64;
        let mut t = (q * n).ceil();
        t += (self.invariant.allowed(n, t) / 2.0).ceil();

        let mut prev = first;
        let mut r = 0.0;
        for c in rest {
            r += prev.width as f64;
            if r + c.width as f64 + c.delta as f64 > t {
                return Some(prev.value);
            }
            prev = c;
        }
        Some(prev.value)
    }

    /// Clears all samples and zeroes the observation count.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.n = 0;
    }

    /// Returns the number of observations absorbed.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.n
    }

    /// Returns the number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if nothing has been merged since creation or the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the retained samples in ascending value order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Returns the invariant this stream compresses under.
    #[must_use]
    pub const fn invariant(&self) -> &Invariant {
        &self.invariant
    }
}
