//! Bucketed distributions.
//!
//! A [`Histogram`] counts observations into fixed, cumulative buckets. Unlike
//! a summary it never forgets: every observation since creation is counted.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::atomic::AtomicF64;
use crate::error::{MetricsError, Result};
use crate::exposition::{format_value, instance_labels, write_header, write_sample};
use crate::types::{MetricKind, MetricName};

/// Latency boundaries in seconds, from 5ms to 10s.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Returns `count` boundaries starting at `start`, each `factor` times the previous.
///
/// # Errors
///
/// Returns `MetricsError::InvalidBuckets` if `count` is zero, `start` is not
/// positive, or `factor` is not greater than 1.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(invalid_buckets("exponential buckets need a count of at least 1"));
    }
    if start <= 0.0 || !start.is_finite() {
        return Err(invalid_buckets(format!(
            "exponential buckets need a positive start, got {start}"
        )));
    }
    if factor <= 1.0 || !factor.is_finite() {
        return Err(invalid_buckets(format!(
            "exponential buckets need a factor greater than 1, got {factor}"
        )));
    }

    let mut buckets = Vec::with_capacity(count);
    let mut next = start;
    for _ in 0..count {
        buckets.push(next);
        next *= factor;
    }
    Ok(buckets)
}

/// Returns `count` boundaries starting at `start`, spaced `width` apart.
///
/// # Errors
///
/// Returns `MetricsError::InvalidBuckets` if `count` is zero or `width` is not positive.
pub fn linear_buckets(start: f64, width: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(invalid_buckets("linear buckets need a count of at least 1"));
    }
    if width <= 0.0 || !width.is_finite() || !start.is_finite() {
        return Err(invalid_buckets(format!(
            "linear buckets need a finite start and positive width, got start {start} width {width}"
        )));
    }

    Ok((0..count).map(|i| start + width * i as f64).collect())
}

fn invalid_buckets(reason: impl Into<String>) -> MetricsError {
    MetricsError::InvalidBuckets {
        reason: reason.into(),
    }
}

/// Checks boundaries and strips an explicit trailing `+Inf`, which is always implied.
fn validate_buckets(buckets: &[f64]) -> Result<Box<[f64]>> {
    let buckets = match buckets.split_last() {
        Some((last, rest)) if *last == f64::INFINITY => rest,
        _ => buckets,
    };

    if buckets.is_empty() {
        return Err(invalid_buckets("histogram needs at least one finite bucket"));
    }
    if buckets.iter().any(|b| b.is_nan()) {
        return Err(invalid_buckets("bucket boundaries cannot be NaN"));
    }
    if let Some(pair) = buckets.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(invalid_buckets(format!(
            "bucket boundaries must be strictly increasing, got {} before {}",
            pair[0], pair[1]
        )));
    }
    Ok(buckets.into())
}

/// Per-instance bucket counters.
///
/// `counts` holds one non-cumulative slot per finite boundary plus a final
/// overflow slot, so the `+Inf` total is derived from the same loads as the
/// finite buckets and can never fall below them.
#[derive(Debug)]
struct HistogramCore {
    counts: Box<[AtomicU64]>,
    sum: AtomicF64,
}

impl HistogramCore {
    fn new(bounds: usize) -> Self {
        Self {
            counts: (0..=bounds).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicF64::default(),
        }
    }

    fn observe(&self, bounds: &[f64], value: f64) {
        // Values above the last boundary land in the overflow slot.
        let index = bounds.partition_point(|b| *b < value);
        if let Some(bucket) = self.counts.get(index) {
            bucket.fetch_add(1, Ordering::Relaxed);
        }
        self.sum.add(value);
    }

    fn snapshot(&self, bounds: &[f64]) -> HistogramSnapshot {
        let mut cumulative = 0;
        let buckets = bounds
            .iter()
            .zip(self.counts.iter())
            .map(|(bound, bucket)| {
                cumulative += bucket.load(Ordering::Relaxed);
                (*bound, cumulative)
            })
            .collect();
        let overflow = self
            .counts
            .get(bounds.len())
            .map_or(0, |slot| slot.load(Ordering::Relaxed));

        HistogramSnapshot {
            buckets,
            sum: self.sum.get(),
            count: cumulative + overflow,
        }
    }
}

/// Point-in-time view of one histogram instance.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper bound, cumulative count)` for every finite boundary.
    pub buckets: Vec<(f64, u64)>,
    /// Sum of all observations.
    pub sum: f64,
    /// Number of observations; the implicit `+Inf` bucket.
    pub count: u64,
}

impl HistogramSnapshot {
    fn write_to<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        name: &MetricName,
        label: Option<&str>,
    ) -> std::io::Result<()> {
        for (bound, cumulative) in &self.buckets {
            let le = format_value(*bound);
            let labels = bucket_labels(label, &le);
            write_sample(writer, name, "_bucket", &labels, *cumulative as f64)?;
        }
        let labels = bucket_labels(label, "+Inf");
        write_sample(writer, name, "_bucket", &labels, self.count as f64)?;

        let labels = instance_labels(label);
        write_sample(writer, name, "_sum", &labels, self.sum)?;
        write_sample(writer, name, "_count", &labels, self.count as f64)
    }
}

fn bucket_labels<'a>(label: Option<&'a str>, le: &'a str) -> Vec<(&'a str, &'a str)> {
    let mut labels = instance_labels(label);
    labels.push(("le", le));
    labels
}

/// A distribution counted into fixed buckets.
#[derive(Debug)]
pub struct Histogram {
    name: MetricName,
    bounds: Box<[f64]>,
    default: HistogramCore,
    labeled: DashMap<String, HistogramCore>,
}

impl Histogram {
    /// Creates a histogram with the given upper bounds.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidBuckets` if the bounds are empty, contain
    /// NaN, or are not strictly increasing.
    pub fn new(name: MetricName, buckets: &[f64]) -> Result<Self> {
        let bounds = validate_buckets(buckets)?;
        Ok(Self {
            name,
            default: HistogramCore::new(bounds.len()),
            bounds,
            labeled: DashMap::new(),
        })
    }

    /// Returns the metric name.
    #[must_use]
    pub const fn name(&self) -> &MetricName {
        &self.name
    }

    /// Returns the finite bucket upper bounds.
    #[must_use]
    pub fn buckets(&self) -> &[f64] {
        &self.bounds
    }

    /// Records an observation. NaN is discarded.
    pub fn observe(&self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.default.observe(&self.bounds, value);
    }

    /// Records an observation for a labeled instance. NaN is discarded.
    pub fn observe_with_label(&self, label: &str, value: f64) {
        if value.is_nan() {
            return;
        }
        if let Some(core) = self.labeled.get(label) {
            core.observe(&self.bounds, value);
            return;
        }
        self.labeled
            .entry(label.to_owned())
            .or_insert_with(|| HistogramCore::new(self.bounds.len()))
            .observe(&self.bounds, value);
    }

    /// Returns the current state of the default instance.
    #[must_use]
    pub fn snapshot(&self) -> HistogramSnapshot {
        self.default.snapshot(&self.bounds)
    }

    /// Returns the current state of a labeled instance, if it has been observed.
    #[must_use]
    pub fn label_snapshot(&self, label: &str) -> Option<HistogramSnapshot> {
        self.labeled
            .get(label)
            .map(|core| core.snapshot(&self.bounds))
    }

    /// Writes the histogram in text exposition format.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        let labeled: Vec<(String, HistogramSnapshot)> = self
            .labeled
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot(&self.bounds)))
            .collect();

        write_header(writer, &self.name, MetricKind::Histogram)?;
        self.snapshot().write_to(writer, &self.name, None)?;
        for (label, snapshot) in &labeled {
            snapshot.write_to(writer, &self.name, Some(label))?;
        }
        Ok(())
    }
}
