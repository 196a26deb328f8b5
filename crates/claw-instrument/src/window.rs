//! Sliding-window quantile estimation.
//!
//! A [`SummaryWindow`] keeps `age_buckets` quantile streams that all receive
//! every observation. The head stream is the oldest and answers queries; every
//! `max_age / age_buckets` it is reset and the next stream becomes the head.
//! Quantiles therefore cover between `max_age - stream_duration` and `max_age`
//! of history without storing a timestamp per observation.
//!
//! Observations land in a small hot buffer under a cheap lock. When the buffer
//! fills, or its expiry passes, it is swapped with the cold buffer and the cold
//! values are compressed into the streams under a second lock.
//!
//! # Lock order
//!
//! The buffer lock is always taken before the stream lock. [`WindowLock`]
//! enforces this: the stream lock is only reachable through
//! [`BufferGuard::lock_streams`], which needs the buffer guard.

use std::io::Write;
use std::time::{Duration, Instant};

use claw_quantile::{QuantileEpsilonPair, QuantileStream, SampleBuffer};
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::config::SummaryOpts;
use crate::error::Result;
use crate::exposition::{format_value, instance_labels, write_sample};
use crate::types::MetricName;

/// State behind the buffer lock.
#[derive(Debug)]
struct HotBuffer {
    buf: SampleBuffer,
    exp_time: Instant,
}

/// State behind the stream lock.
#[derive(Debug)]
struct Streams {
    buckets: Box<[QuantileStream]>,
    head: usize,
    head_exp_time: Instant,
    cold: SampleBuffer,
    count: u64,
    sum: f64,
}

/// The two locks of a window.
#[derive(Debug)]
struct WindowLock {
    hot: Mutex<HotBuffer>,
    streams: Mutex<Streams>,
}

impl WindowLock {
    fn lock(&self) -> BufferGuard<'_> {
        BufferGuard {
            hot: self.hot.lock(),
            streams: &self.streams,
        }
    }
}

/// Holds the buffer lock; grants access to the stream lock.
struct BufferGuard<'a> {
    hot: MutexGuard<'a, HotBuffer>,
    streams: &'a Mutex<Streams>,
}

impl BufferGuard<'_> {
    fn lock_streams(&mut self) -> StreamsGuard<'_> {
        StreamsGuard {
            hot: &mut self.hot,
            streams: self.streams.lock(),
        }
    }
}

/// Holds both locks.
struct StreamsGuard<'g> {
    hot: &'g mut HotBuffer,
    streams: MutexGuard<'g, Streams>,
}

impl StreamsGuard<'_> {
    fn flush(&mut self, now: Instant, stream_duration: Duration) {
        self.swap_buffers(now, stream_duration);
        self.drain_cold_buffer(stream_duration);
    }

    fn swap_buffers(&mut self, now: Instant, stream_duration: Duration) {
        assert!(
            self.streams.cold.is_empty(),
            "cold buffer must be drained before it is swapped"
        );
        std::mem::swap(&mut self.hot.buf, &mut self.streams.cold);
        while self.hot.exp_time <= now {
            self.hot.exp_time += stream_duration;
        }
    }

    fn drain_cold_buffer(&mut self, stream_duration: Duration) {
        let streams = &mut *self.streams;
        for &value in streams.cold.as_slice() {
            for bucket in streams.buckets.iter_mut() {
                bucket.insert(value);
            }
            streams.count += 1;
            streams.sum += value;
        }
        streams.cold.reset();
        self.maybe_rotate_buckets(stream_duration);
    }

    fn maybe_rotate_buckets(&mut self, stream_duration: Duration) {
        let streams = &mut *self.streams;
        let mut rotated = 0_usize;
        while streams.head_exp_time != self.hot.exp_time {
            streams.buckets[streams.head].reset();
            streams.head = (streams.head + 1) % streams.buckets.len();
            streams.head_exp_time += stream_duration;
            rotated += 1;
        }
        if rotated > 0 {
            debug!(rotated, head = streams.head, "rotated summary age buckets");
        }
    }

    fn snapshot(&mut self, objectives: &[QuantileEpsilonPair]) -> SummarySnapshot {
        let streams = &mut *self.streams;
        let head = &mut streams.buckets[streams.head];
        let quantiles = objectives
            .iter()
            .map(|objective| {
                let q = objective.quantile();
                let value = if head.count() == 0 {
                    f64::NAN
                } else {
                    head.query(q)
                };
                (q, value)
            })
            .collect();

        SummarySnapshot {
            count: streams.count,
            sum: streams.sum,
            quantiles,
        }
    }
}

/// Point-in-time view of one summary window.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    /// Number of observations since the window was created.
    pub count: u64,
    /// Sum of all observations since the window was created.
    pub sum: f64,
    /// `(quantile, estimate)` per objective, ascending by quantile. The
    /// estimate is NaN when the window holds no recent observations.
    pub quantiles: Vec<(f64, f64)>,
}

impl SummarySnapshot {
    /// Returns the estimate for quantile `q`, if it is an objective.
    #[must_use]
    pub fn quantile(&self, q: f64) -> Option<f64> {
        self.quantiles
            .iter()
            .find(|(quantile, _)| *quantile == q)
            .map(|(_, value)| *value)
    }

    /// Writes `_sum`, `_count` and one line per quantile.
    pub fn write_to<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        name: &MetricName,
        label: Option<&str>,
    ) -> std::io::Result<()> {
        let labels = instance_labels(label);
        write_sample(writer, name, "_sum", &labels, self.sum)?;
        write_sample(writer, name, "_count", &labels, self.count as f64)?;

        for (q, value) in &self.quantiles {
            let quantile = format_value(*q);
            let mut labels = instance_labels(label);
            labels.push(("quantile", &quantile));
            write_sample(writer, name, "", &labels, *value)?;
        }
        Ok(())
    }
}

/// Quantiles over a moving time window, plus lifetime count and sum.
#[derive(Debug)]
pub struct SummaryWindow {
    objectives: Box<[QuantileEpsilonPair]>,
    stream_duration: Duration,
    lock: WindowLock,
}

impl SummaryWindow {
    /// Creates a window whose first age bucket expires one stream duration after `now`.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidConfig` if `opts` fails validation.
    pub fn new(opts: &SummaryOpts, now: Instant) -> Result<Self> {
        opts.validate()?;
        Ok(Self::with_validated(opts, now))
    }

    pub(crate) fn with_validated(opts: &SummaryOpts, now: Instant) -> Self {
        let objectives: Box<[QuantileEpsilonPair]> = opts.sorted_objectives().into();
        let stream_duration = opts.stream_duration();
        let exp_time = now + stream_duration;

        let buckets = (0..opts.age_buckets)
            .map(|_| QuantileStream::targeted(&objectives))
            .collect();

        Self {
            objectives,
            stream_duration,
            lock: WindowLock {
                hot: Mutex::new(HotBuffer {
                    buf: SampleBuffer::new(opts.buf_cap),
                    exp_time,
                }),
                streams: Mutex::new(Streams {
                    buckets,
                    head: 0,
                    head_exp_time: exp_time,
                    cold: SampleBuffer::new(opts.buf_cap),
                    count: 0,
                    sum: 0.0,
                }),
            },
        }
    }

    /// Returns the objectives, ascending by quantile.
    #[must_use]
    pub fn objectives(&self) -> &[QuantileEpsilonPair] {
        &self.objectives
    }

    /// Records an observation made at `now`. NaN is ignored.
    pub fn observe_at(&self, value: f64, now: Instant) {
        if value.is_nan() {
            return;
        }

        let mut guard = self.lock.lock();
        if now > guard.hot.exp_time {
            guard.lock_streams().flush(now, self.stream_duration);
        }
        guard.hot.buf.push(value);
        if guard.hot.buf.is_full() {
            guard.lock_streams().flush(now, self.stream_duration);
        }
    }

    /// Compresses pending observations and returns the window state at `now`.
    ///
    /// Both locks are released before this returns.
    pub fn snapshot_at(&self, now: Instant) -> SummarySnapshot {
        let mut guard = self.lock.lock();
        let mut streams = guard.lock_streams();
        streams.flush(now, self.stream_duration);
        streams.snapshot(&self.objectives)
    }

    /// Writes the window state at `now` in text exposition format.
    pub fn write_to<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        name: &MetricName,
        label: Option<&str>,
        now: Instant,
    ) -> std::io::Result<()> {
        self.snapshot_at(now).write_to(writer, name, label)
    }
}
