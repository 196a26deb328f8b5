//! Metric registry and exposition endpoint support.
//!
//! The [`Registry`] owns every metric by name and renders them all in one
//! pass. Metrics are created on first request and shared afterwards, so any
//! part of a program can ask for `registry.counter("x")` and get the same
//! counter.
//!
//! # Example
//!
//! ```rust
//! use claw_instrument::{Registry, SummaryOpts};
//!
//! let registry = Registry::new();
//!
//! let requests = registry.counter("http_requests_total").unwrap();
//! requests.inc_with_label("get");
//!
//! let latency = registry.summary("http_latency_seconds", SummaryOpts::default()).unwrap();
//! latency.observe(0.025);
//!
//! let output = registry.encode();
//! assert!(output.contains("# TYPE http_latency_seconds summary"));
//! assert!(output.contains("http_requests_total{i=\"get\"} 1"));
//! ```

use std::io::Write;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SummaryOpts;
use crate::counter::{Counter, Gauge};
use crate::error::{MetricsError, Result};
use crate::exposition::CONTENT_TYPE;
use crate::histogram::Histogram;
use crate::summary::Summary;
use crate::types::{MetricKind, MetricName};

/// A registered metric of any kind.
#[derive(Debug, Clone)]
pub enum Metric {
    /// A counter.
    Counter(Arc<Counter>),
    /// A gauge.
    Gauge(Arc<Gauge>),
    /// A histogram.
    Histogram(Arc<Histogram>),
    /// A summary.
    Summary(Arc<Summary>),
}

impl Metric {
    /// Returns the kind of this metric.
    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Summary(_) => MetricKind::Summary,
        }
    }

    /// Writes the metric in text exposition format.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Self::Counter(counter) => counter.write_to(writer),
            Self::Gauge(gauge) => gauge.write_to(writer),
            Self::Histogram(histogram) => histogram.write_to(writer),
            Self::Summary(summary) => summary.write_to(writer),
        }
    }
}

/// Refreshes metrics right before the registry renders them.
///
/// Implement this for values that are cheaper to read on demand than to
/// track continuously, such as process statistics.
pub trait Collector: Send + Sync {
    /// Updates metrics in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if collection fails. The render continues without
    /// this collector's updates.
    fn collect(&self, registry: &Registry) -> Result<()>;

    /// Returns the name of this collector for logging purposes.
    fn name(&self) -> &'static str;
}

struct RegistryInner {
    metrics: DashMap<String, Metric>,
    collectors: RwLock<Vec<Box<dyn Collector>>>,
    clock: Arc<dyn Clock>,
}

/// A set of named metrics rendered together.
///
/// Cloning is cheap; clones share the same metrics.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("metric_count", &self.inner.metrics.len())
            .field("collector_count", &self.inner.collectors.read().len())
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Returns the process-wide registry.
#[must_use]
pub fn global() -> &'static Registry {
    &GLOBAL
}

impl Registry {
    /// Creates an empty registry timed by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty registry whose summaries are timed by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                metrics: DashMap::new(),
                collectors: RwLock::new(Vec::new()),
                clock,
            }),
        }
    }

    /// Returns the clock shared by this registry's summaries.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Returns the counter called `name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or taken by another kind.
    pub fn counter(&self, name: &str) -> Result<Arc<Counter>> {
        match self.get_or_register(name, MetricKind::Counter, |name| {
            Ok(Metric::Counter(Arc::new(Counter::new(name))))
        })? {
            Metric::Counter(counter) => Ok(counter),
            other => Err(mismatch(name, &other, MetricKind::Counter)),
        }
    }

    /// Returns the gauge called `name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or taken by another kind.
    pub fn gauge(&self, name: &str) -> Result<Arc<Gauge>> {
        match self.get_or_register(name, MetricKind::Gauge, |name| {
            Ok(Metric::Gauge(Arc::new(Gauge::new(name))))
        })? {
            Metric::Gauge(gauge) => Ok(gauge),
            other => Err(mismatch(name, &other, MetricKind::Gauge)),
        }
    }

    /// Returns the histogram called `name`, creating it with `buckets` if needed.
    ///
    /// An existing histogram keeps the buckets it was created with.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, taken by another kind, or the
    /// buckets are invalid.
    pub fn histogram(&self, name: &str, buckets: &[f64]) -> Result<Arc<Histogram>> {
        match self.get_or_register(name, MetricKind::Histogram, |name| {
            Ok(Metric::Histogram(Arc::new(Histogram::new(name, buckets)?)))
        })? {
            Metric::Histogram(histogram) => Ok(histogram),
            other => Err(mismatch(name, &other, MetricKind::Histogram)),
        }
    }

    /// Returns the summary called `name`, creating it with `opts` if needed.
    ///
    /// An existing summary keeps the options it was created with.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, taken by another kind, or the
    /// options are invalid.
    pub fn summary(&self, name: &str, opts: SummaryOpts) -> Result<Arc<Summary>> {
        let clock = Arc::clone(&self.inner.clock);
        match self.get_or_register(name, MetricKind::Summary, |name| {
            Ok(Metric::Summary(Arc::new(Summary::with_clock(
                name, opts, clock,
            )?)))
        })? {
            Metric::Summary(summary) => Ok(summary),
            other => Err(mismatch(name, &other, MetricKind::Summary)),
        }
    }

    /// Returns the metric called `name`, if registered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Metric> {
        self.inner.metrics.get(name).map(|m| m.value().clone())
    }

    /// Returns the number of registered metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.metrics.len()
    }

    /// Returns `true` if no metrics are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.metrics.is_empty()
    }

    /// Adds a collector run before every render.
    pub fn register_collector(&self, collector: impl Collector + 'static) {
        debug!(collector = collector.name(), "registering collector");
        self.inner.collectors.write().push(Box::new(collector));
    }

    /// Returns the number of registered collectors.
    #[must_use]
    pub fn collector_count(&self) -> usize {
        self.inner.collectors.read().len()
    }

    /// Runs every collector, logging and skipping failures.
    pub fn collect(&self) {
        for collector in self.inner.collectors.read().iter() {
            if let Err(e) = collector.collect(self) {
                warn!(
                    collector = collector.name(),
                    error = %e,
                    "collector failed, skipping"
                );
            }
        }
    }

    /// Runs collectors, then writes every metric sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Io` if the writer fails.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        self.collect();

        let mut metrics: Vec<(String, Metric)> = self
            .inner
            .metrics
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        metrics.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        for (_, metric) in &metrics {
            metric.write_to(writer)?;
        }
        Ok(())
    }

    /// Renders every metric in text exposition format.
    ///
    /// This output can be served directly from a `/metrics` HTTP endpoint.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = self.write_to(&mut buffer) {
            error!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Returns the Content-Type header value for the exposition format.
    #[must_use]
    pub const fn content_type() -> &'static str {
        CONTENT_TYPE
    }

    fn get_or_register(
        &self,
        name: &str,
        requested: MetricKind,
        create: impl FnOnce(MetricName) -> Result<Metric>,
    ) -> Result<Metric> {
        if let Some(metric) = self.inner.metrics.get(name) {
            return Ok(metric.value().clone());
        }

        let name = MetricName::new(name)?;
        match self.inner.metrics.entry(name.as_str().to_owned()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                debug!(metric = %name, kind = %requested, "registering metric");
                let metric = create(name)?;
                entry.insert(metric.clone());
                Ok(metric)
            }
        }
    }
}

fn mismatch(name: &str, registered: &Metric, requested: MetricKind) -> MetricsError {
    MetricsError::TypeMismatch {
        name: name.to_string(),
        registered: registered.kind(),
        requested,
    }
}

/// HTTP handler for serving metrics.
///
/// This struct provides methods for integrating with various HTTP frameworks.
#[derive(Clone, Debug)]
pub struct MetricsHandler {
    registry: Registry,
}

impl MetricsHandler {
    /// Creates a new metrics handler with the given registry.
    #[must_use]
    pub const fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Returns the metrics in text exposition format.
    #[must_use]
    pub fn handle(&self) -> MetricsResponse {
        MetricsResponse {
            body: self.registry.encode(),
            content_type: Registry::content_type().to_string(),
        }
    }

    /// Returns a reference to the underlying registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Response from the metrics handler.
#[derive(Debug, Clone)]
pub struct MetricsResponse {
    /// The response body in text exposition format.
    pub body: String,
    /// The Content-Type header value.
    pub content_type: String,
}

impl MetricsResponse {
    /// Returns the body as bytes.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body.clone().into_bytes()
    }

    /// Writes the response to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.body.as_bytes())
    }
}
