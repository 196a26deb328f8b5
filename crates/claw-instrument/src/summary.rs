//! Summaries: windowed quantiles with lifetime count and sum.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::SummaryOpts;
use crate::error::Result;
use crate::exposition::write_header;
use crate::types::{MetricKind, MetricName};
use crate::window::{SummarySnapshot, SummaryWindow};

/// A named summary with a default window and lazily created labeled windows.
///
/// Labeled windows are created on first observation and live as long as the
/// summary. Each window has its own locks, so observers of different labels
/// never contend.
#[derive(Debug)]
pub struct Summary {
    name: MetricName,
    opts: SummaryOpts,
    clock: Arc<dyn Clock>,
    default: SummaryWindow,
    labeled: DashMap<String, Arc<SummaryWindow>>,
}

impl Summary {
    /// Creates a summary timed by the system clock.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidConfig` if `opts` fails validation.
    pub fn new(name: MetricName, opts: SummaryOpts) -> Result<Self> {
        Self::with_clock(name, opts, Arc::new(SystemClock))
    }

    /// Creates a summary timed by `clock`.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidConfig` if `opts` fails validation.
    pub fn with_clock(name: MetricName, opts: SummaryOpts, clock: Arc<dyn Clock>) -> Result<Self> {
        opts.validate()?;
        let default = SummaryWindow::with_validated(&opts, clock.now());
        Ok(Self {
            name,
            opts,
            clock,
            default,
            labeled: DashMap::new(),
        })
    }

    /// Returns the metric name.
    #[must_use]
    pub const fn name(&self) -> &MetricName {
        &self.name
    }

    /// Returns the options every window of this summary uses.
    #[must_use]
    pub const fn opts(&self) -> &SummaryOpts {
        &self.opts
    }

    /// Records an observation in the default window.
    pub fn observe(&self, value: f64) {
        self.observe_at(value, self.clock.now());
    }

    /// Records an observation in the default window at an explicit time.
    pub fn observe_at(&self, value: f64, now: Instant) {
        self.default.observe_at(value, now);
    }

    /// Records an observation in the window for `label`.
    pub fn observe_with_label(&self, label: &str, value: f64) {
        self.observe_with_label_at(label, value, self.clock.now());
    }

    /// Records an observation in the window for `label` at an explicit time.
    ///
    /// NaN is ignored without creating the labeled window.
    pub fn observe_with_label_at(&self, label: &str, value: f64, now: Instant) {
        if value.is_nan() {
            return;
        }
        self.window(label, now).observe_at(value, now);
    }

    fn window(&self, label: &str, now: Instant) -> Arc<SummaryWindow> {
        if let Some(window) = self.labeled.get(label) {
            return Arc::clone(window.value());
        }
        let window = self.labeled.entry(label.to_owned()).or_insert_with(|| {
            debug!(metric = %self.name, label, "creating summary window");
            Arc::new(SummaryWindow::with_validated(&self.opts, now))
        });
        Arc::clone(window.value())
    }

    /// Returns the state of the default window now.
    #[must_use]
    pub fn snapshot(&self) -> SummarySnapshot {
        self.snapshot_at(self.clock.now())
    }

    /// Returns the state of the default window at `now`.
    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> SummarySnapshot {
        self.default.snapshot_at(now)
    }

    /// Returns the state of the window for `label` now, if it exists.
    #[must_use]
    pub fn label_snapshot(&self, label: &str) -> Option<SummarySnapshot> {
        self.label_snapshot_at(label, self.clock.now())
    }

    /// Returns the state of the window for `label` at `now`, if it exists.
    #[must_use]
    pub fn label_snapshot_at(&self, label: &str, now: Instant) -> Option<SummarySnapshot> {
        let window = self.labeled.get(label).map(|w| Arc::clone(w.value()))?;
        Some(window.snapshot_at(now))
    }

    /// Returns the labels that have a window.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.labeled.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Writes every window in text exposition format.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        self.write_to_at(writer, self.clock.now())
    }

    /// Writes every window as of `now` in text exposition format.
    pub fn write_to_at<W: Write + ?Sized>(&self, writer: &mut W, now: Instant) -> std::io::Result<()> {
        let labeled: Vec<(String, Arc<SummaryWindow>)> = self
            .labeled
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        write_header(writer, &self.name, MetricKind::Summary)?;
        self.default.write_to(writer, &self.name, None, now)?;
        for (label, window) in &labeled {
            window.write_to(writer, &self.name, Some(label), now)?;
        }
        Ok(())
    }
}
