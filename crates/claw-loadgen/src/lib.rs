//! # claw-loadgen
//!
//! Load generator for `claw-instrument`.
//!
//! Spawns observer threads that feed exponentially distributed latencies
//! into a summary, a histogram and a counter while the calling thread
//! prints the registry in the Prometheus text format at a fixed interval.
//!
//! ```text
//! worker-0 ─┐
//! worker-1 ─┼──► Registry ──► stdout (every --interval-ms)
//! worker-N ─┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod load;

pub use cli::Cli;
pub use load::{LoadReport, run, summary_opts};
