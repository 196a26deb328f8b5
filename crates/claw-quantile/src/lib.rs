//! Approximate streaming quantiles with bounded memory.
//!
//! `claw-quantile` implements the biased quantile estimator described by
//! Cormode, Korn, Muthukrishnan and Srivastava. Observations are batched,
//! sorted and merged into a compressed, rank-ordered list of samples whose
//! size depends on the error bound rather than on the length of the stream.
//!
//! # Features
//!
//! - **Error policies**: low-biased, high-biased and targeted (multi-quantile) invariants
//! - **Batched inserts**: raw values are merged 500 at a time to amortize compression
//! - **Exact small sets**: streams that never filled a batch answer from the sorted batch
//! - **Raw buffers**: fixed-capacity [`SampleBuffer`] used for hot/cold double buffering
//!
//! # Example
//!
//! ```rust
//! use claw_quantile::{QuantileEpsilonPair, QuantileStream};
//!
//! let targets = [
//!     QuantileEpsilonPair::new(0.5, 0.05).unwrap(),
//!     QuantileEpsilonPair::new(0.99, 0.001).unwrap(),
//! ];
//! let mut stream = QuantileStream::targeted(&targets);
//!
//! for i in 1..=10_000 {
//!     stream.insert(f64::from(i));
//! }
//!
//! let median = stream.query(0.5);
//! assert!((median - 5_000.0).abs() <= 500.0);
//! ```

#![forbid(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/claw-quantile/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;
pub mod invariant;
pub mod quantile;
pub mod sample;
pub mod stream;

// Re-export main types at crate root
pub use buffer::SampleBuffer;
pub use error::{QuantileError, Result};
pub use invariant::Invariant;
pub use quantile::{QuantileStream, SCRATCH_CAPACITY};
pub use sample::{DEFAULT_OBJECTIVES, QuantileEpsilonPair, Sample};
pub use stream::SampleStream;
