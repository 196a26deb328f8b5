//! Benchmarks for claw-instrument.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use claw_instrument::{DEFAULT_BUCKETS, Registry, SummaryOpts};

fn benchmark_summary_observe(c: &mut Criterion) {
    let registry = Registry::new();
    let summary = registry
        .summary("benchmark_summary", SummaryOpts::default())
        .unwrap();

    let mut i = 0_u32;
    c.bench_function("summary_observe", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            summary.observe(black_box(f64::from(i % 1_000)));
        });
    });
}

fn benchmark_summary_observe_with_label(c: &mut Criterion) {
    let registry = Registry::new();
    let summary = registry
        .summary("benchmark_labeled_summary", SummaryOpts::default())
        .unwrap();

    let mut i = 0_u32;
    c.bench_function("summary_observe_with_label", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            summary.observe_with_label("get", black_box(f64::from(i % 1_000)));
        });
    });
}

fn benchmark_summary_render(c: &mut Criterion) {
    let registry = Registry::new();
    let summary = registry
        .summary("benchmark_render_summary", SummaryOpts::default())
        .unwrap();

    // Pre-populate with data
    for i in 0..10_000 {
        summary.observe(f64::from(i));
    }

    c.bench_function("summary_render_10k", |b| {
        b.iter(|| {
            let _ = black_box(registry.encode());
        });
    });
}

fn benchmark_counter_inc(c: &mut Criterion) {
    let registry = Registry::new();
    let counter = registry.counter("benchmark_counter_total").unwrap();

    c.bench_function("counter_inc", |b| {
        b.iter(|| counter.inc());
    });
}

fn benchmark_histogram_observe(c: &mut Criterion) {
    let registry = Registry::new();
    let histogram = registry
        .histogram("benchmark_histogram", &DEFAULT_BUCKETS)
        .unwrap();

    c.bench_function("histogram_observe", |b| {
        b.iter(|| histogram.observe(black_box(0.3)));
    });
}

criterion_group!(
    benches,
    benchmark_summary_observe,
    benchmark_summary_observe_with_label,
    benchmark_summary_render,
    benchmark_counter_inc,
    benchmark_histogram_observe,
);

criterion_main!(benches);
