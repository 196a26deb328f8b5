//! Process instrumentation with windowed streaming quantiles.
//!
//! `claw-instrument` provides the four Prometheus metric types and renders
//! them in the text exposition format. Summaries report approximate
//! quantiles over a moving time window in bounded memory, using the
//! `claw-quantile` engine.
//!
//! # Features
//!
//! - **Counters and gauges**: Lock-free updates, optional per-instance labels
//! - **Histograms**: Fixed cumulative buckets with exponential and linear helpers
//! - **Summaries**: Quantiles over the last `max_age`, rotated through age buckets
//! - **Registry**: Get-or-create by name, collectors run before every render
//! - **Process statistics**: CPU, memory, threads and file descriptors from procfs
//!
//! # Example
//!
//! ```rust
//! use claw_instrument::{Registry, SummaryOpts};
//!
//! let registry = Registry::new();
//! let latency = registry.summary("rpc_latency_seconds", SummaryOpts::default()).unwrap();
//!
//! for i in 0..100 {
//!     latency.observe(f64::from(i));
//! }
//!
//! let output = registry.encode();
//! assert!(output.contains("rpc_latency_seconds_count 100"));
//! assert!(output.contains("rpc_latency_seconds_sum 4950"));
//! ```

#![forbid(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/claw-instrument/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod atomic;
pub mod clock;
pub mod config;
pub mod counter;
pub mod error;
pub mod exposition;
pub mod histogram;
pub mod process;
pub mod registry;
pub mod summary;
pub mod types;
pub mod window;

// Re-export main types at crate root
pub use claw_quantile::{DEFAULT_OBJECTIVES, QuantileEpsilonPair};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SummaryOpts;
pub use counter::{Counter, Gauge};
pub use error::{MetricsError, Result};
pub use exposition::CONTENT_TYPE;
pub use histogram::{
    DEFAULT_BUCKETS, Histogram, HistogramSnapshot, exponential_buckets, linear_buckets,
};
pub use process::ProcessCollector;
pub use registry::{Collector, Metric, MetricsHandler, MetricsResponse, Registry, global};
pub use summary::Summary;
pub use types::{MetricKind, MetricName};
pub use window::{SummarySnapshot, SummaryWindow};
