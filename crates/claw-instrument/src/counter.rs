//! Counters and gauges.
//!
//! Both hold one default accumulator plus a map of labeled accumulators,
//! created on first use. Updates never take a lock on the default value and
//! only a shard lock of the label map for labeled values.

use std::io::Write;

use dashmap::DashMap;
use tracing::debug;

use crate::atomic::AtomicF64;
use crate::exposition::{INSTANCE_LABEL, write_header, write_sample};
use crate::types::{MetricKind, MetricName};

/// Accumulators shared by [`Counter`] and [`Gauge`].
#[derive(Debug, Default)]
struct ValueFamily {
    value: AtomicF64,
    labeled: DashMap<String, AtomicF64>,
}

impl ValueFamily {
    fn with_label<R>(&self, label: &str, f: impl FnOnce(&AtomicF64) -> R) -> R {
        if let Some(value) = self.labeled.get(label) {
            return f(&value);
        }
        let value = self.labeled.entry(label.to_owned()).or_default();
        f(&value)
    }

    fn get_label(&self, label: &str) -> f64 {
        self.labeled.get(label).map_or(0.0, |v| v.get())
    }

    fn write_to<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        name: &MetricName,
        kind: MetricKind,
    ) -> std::io::Result<()> {
        // Snapshot before writing so no shard lock is held during I/O.
        let labeled: Vec<(String, f64)> = self
            .labeled
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().get()))
            .collect();

        write_header(writer, name, kind)?;
        write_sample(writer, name, "", &[], self.value.get())?;
        for (label, value) in &labeled {
            write_sample(writer, name, "", &[(INSTANCE_LABEL, label)], *value)?;
        }
        Ok(())
    }
}

/// A monotonically increasing value.
#[derive(Debug)]
pub struct Counter {
    name: MetricName,
    values: ValueFamily,
}

impl Counter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new(name: MetricName) -> Self {
        Self {
            name,
            values: ValueFamily::default(),
        }
    }

    /// Returns the metric name.
    #[must_use]
    pub const fn name(&self) -> &MetricName {
        &self.name
    }

    /// Increments the counter by one.
    pub fn inc(&self) {
        self.add(1.0);
    }

    /// Adds `delta` to the counter.
    ///
    /// Negative and NaN increments are discarded.
    pub fn add(&self, delta: f64) {
        if Self::accepts(&self.name, delta) {
            self.values.value.add(delta);
        }
    }

    /// Increments the labeled counter by one.
    pub fn inc_with_label(&self, label: &str) {
        self.add_with_label(label, 1.0);
    }

    /// Adds `delta` to the labeled counter.
    pub fn add_with_label(&self, label: &str, delta: f64) {
        if Self::accepts(&self.name, delta) {
            self.values.with_label(label, |v| v.add(delta));
        }
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> f64 {
        self.values.value.get()
    }

    /// Returns the current value of a labeled counter, zero if never touched.
    #[must_use]
    pub fn get_with_label(&self, label: &str) -> f64 {
        self.values.get_label(label)
    }

    /// Writes the counter in text exposition format.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        self.values.write_to(writer, &self.name, MetricKind::Counter)
    }

    fn accepts(name: &MetricName, delta: f64) -> bool {
        if delta >= 0.0 {
            return true;
        }
        debug!(metric = %name, delta, "discarding non-monotonic counter increment");
        false
    }
}

/// A value that can be set, increased and decreased.
#[derive(Debug)]
pub struct Gauge {
    name: MetricName,
    values: ValueFamily,
}

impl Gauge {
    /// Creates a gauge starting at zero.
    #[must_use]
    pub fn new(name: MetricName) -> Self {
        Self {
            name,
            values: ValueFamily::default(),
        }
    }

    /// Returns the metric name.
    #[must_use]
    pub const fn name(&self) -> &MetricName {
        &self.name
    }

    /// Sets the gauge.
    pub fn set(&self, value: f64) {
        self.values.value.set(value);
    }

    /// Increments the gauge by one.
    pub fn inc(&self) {
        self.add(1.0);
    }

    /// Decrements the gauge by one.
    pub fn dec(&self) {
        self.add(-1.0);
    }

    /// Adds `delta` to the gauge.
    pub fn add(&self, delta: f64) {
        self.values.value.add(delta);
    }

    /// Subtracts `delta` from the gauge.
    pub fn sub(&self, delta: f64) {
        self.add(-delta);
    }

    /// Sets the labeled gauge.
    pub fn set_with_label(&self, label: &str, value: f64) {
        self.values.with_label(label, |v| v.set(value));
    }

    /// Increments the labeled gauge by one.
    pub fn inc_with_label(&self, label: &str) {
        self.add_with_label(label, 1.0);
    }

    /// Decrements the labeled gauge by one.
    pub fn dec_with_label(&self, label: &str) {
        self.add_with_label(label, -1.0);
    }

    /// Adds `delta` to the labeled gauge.
    pub fn add_with_label(&self, label: &str, delta: f64) {
        self.values.with_label(label, |v| v.add(delta));
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> f64 {
        self.values.value.get()
    }

    /// Returns the current value of a labeled gauge, zero if never touched.
    #[must_use]
    pub fn get_with_label(&self, label: &str) -> f64 {
        self.values.get_label(label)
    }

    /// Writes the gauge in text exposition format.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        self.values.write_to(writer, &self.name, MetricKind::Gauge)
    }
}
