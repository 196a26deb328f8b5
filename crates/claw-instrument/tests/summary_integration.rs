//! Summary Behaviour Tests
//!
//! These tests drive summaries through a registry the way an application would:
//! - Count and sum track every non-NaN observation
//! - Quantile estimates stay within their rank error band
//! - Rendering is idempotent
//! - Quantiles age out while totals are kept
//! - Bursts larger than the buffer are not lost
//! - Concurrent observers and renderers agree on totals

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use claw_instrument::{
    ManualClock, MetricsError, QuantileEpsilonPair, Registry, SummaryOpts, exponential_buckets,
};

fn registry_with_clock() -> (Registry, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (Registry::with_clock(clock.clone()), clock)
}

fn line_value(output: &str, prefix: &str) -> f64 {
    output
        .lines()
        .find_map(|line| line.strip_prefix(prefix))
        .and_then(|rest| rest.trim().parse().ok())
        .unwrap_or_else(|| panic!("no line starting with '{prefix}' in:\n{output}"))
}

// ============================================================================
// Test: Count And Sum
// ============================================================================

#[test]
fn test_zero_to_ninety_nine_at_constant_time() {
    let (registry, _clock) = registry_with_clock();
    let summary = registry.summary("rpc_latency", SummaryOpts::default()).unwrap();

    for i in 0..100 {
        summary.observe(f64::from(i));
    }

    let output = registry.encode();
    assert!(output.contains("# TYPE rpc_latency summary\n"));
    assert_eq!(line_value(&output, "rpc_latency_count "), 100.0);
    assert_eq!(line_value(&output, "rpc_latency_sum "), 4950.0);

    let median = line_value(&output, "rpc_latency{quantile=\"0.5\"} ");
    assert!((44.0..=55.0).contains(&median), "median {median}");
}

#[test]
fn test_nan_leaves_totals_unchanged() {
    let (registry, _clock) = registry_with_clock();
    let summary = registry.summary("rpc_latency", SummaryOpts::default()).unwrap();

    summary.observe(2.0);
    let before = summary.snapshot();
    summary.observe(f64::NAN);
    summary.observe_with_label("get", f64::NAN);
    let after = summary.snapshot();

    assert_eq!(before.count, after.count);
    assert_eq!(before.sum, after.sum);
    assert!(summary.labels().is_empty());
}

// ============================================================================
// Test: Quantile Accuracy
// ============================================================================

#[test]
fn test_uniform_input_within_rank_band() {
    let (registry, _clock) = registry_with_clock();
    let summary = registry.summary("uniform", SummaryOpts::default()).unwrap();

    // 7919 is coprime with 10007, so this visits 1..10007 in a scrambled order.
    let n = 10_006_u32;
    for i in 1..=n {
        summary.observe(f64::from((i * 7919) % 10_007));
    }

    let snapshot = summary.snapshot();
    assert_eq!(snapshot.count, u64::from(n));

    for objective in &SummaryOpts::default().objectives {
        let q = objective.quantile();
        let eps = objective.epsilon();
        let estimate = snapshot.quantile(q).unwrap();
        let low = (q - eps) * f64::from(n);
        let high = (q + eps) * f64::from(n);
        assert!(
            (low..=high).contains(&estimate),
            "q={q} estimate {estimate} outside [{low}, {high}]"
        );
    }
}

#[test]
fn test_custom_objectives() {
    let (registry, _clock) = registry_with_clock();
    let opts = SummaryOpts::default().with_objectives(vec![
        QuantileEpsilonPair::new(0.25, 0.01).unwrap(),
        QuantileEpsilonPair::new(0.75, 0.01).unwrap(),
    ]);
    let summary = registry.summary("quartiles", opts).unwrap();
    for i in 0..1_000 {
        summary.observe(f64::from(i));
    }

    let output = registry.encode();
    assert!(output.contains("quartiles{quantile=\"0.25\"}"));
    assert!(output.contains("quartiles{quantile=\"0.75\"}"));
    assert!(!output.contains("quartiles{quantile=\"0.5\"}"));
}

// ============================================================================
// Test: Rendering
// ============================================================================

#[test]
fn test_consecutive_renders_are_identical() {
    let (registry, _clock) = registry_with_clock();
    let summary = registry.summary("rpc_latency", SummaryOpts::default()).unwrap();
    for i in 0..5_000 {
        summary.observe(f64::from(i % 997));
        summary.observe_with_label("get", f64::from(i % 13));
    }

    let first = registry.encode();
    let second = registry.encode();
    assert_eq!(first, second);
}

#[test]
fn test_labeled_instances_render_after_default() {
    let (registry, _clock) = registry_with_clock();
    let summary = registry.summary("rpc_latency", SummaryOpts::default()).unwrap();
    summary.observe_with_label("get", 1.0);

    let output = registry.encode();
    let default_count = output.find("rpc_latency_count 0\n").unwrap();
    let labeled_count = output.find("rpc_latency_count{i=\"get\"} 1\n").unwrap();
    assert!(default_count < labeled_count);
    assert!(output.contains("rpc_latency{quantile=\"0.5\"} NaN\n"));
}

// ============================================================================
// Test: Aging
// ============================================================================

#[test]
fn test_quantiles_expire_after_max_age() {
    let (registry, clock) = registry_with_clock();
    let summary = registry.summary("rpc_latency", SummaryOpts::default()).unwrap();
    for i in 0..100 {
        summary.observe(f64::from(i));
    }
    let _ = registry.encode();

    clock.advance(Duration::from_secs(600));
    let snapshot = summary.snapshot();

    assert_eq!(snapshot.count, 100);
    assert_eq!(snapshot.sum, 4950.0);
    assert!(snapshot.quantiles.iter().all(|(_, value)| value.is_nan()));
}

#[test]
fn test_window_slides_with_time() {
    let (registry, clock) = registry_with_clock();
    let opts = SummaryOpts::default()
        .with_max_age(Duration::from_secs(60))
        .with_age_buckets(3);
    let summary = registry.summary("sliding", opts).unwrap();

    // Every 20s step observes its own value; only the recent ones survive.
    for step in 0..10 {
        for _ in 0..50 {
            summary.observe(f64::from(step));
        }
        clock.advance(Duration::from_secs(20));
    }

    let snapshot = summary.snapshot();
    assert_eq!(snapshot.count, 500);
    let median = snapshot.quantile(0.5).unwrap();
    assert!(median >= 7.0, "median {median} should come from recent values");
}

#[test]
fn test_sub_second_window() {
    let (registry, clock) = registry_with_clock();
    let opts = SummaryOpts::default()
        .with_max_age(Duration::from_millis(500))
        .with_age_buckets(5);
    let summary = registry.summary("fast", opts).unwrap();
    assert_eq!(summary.opts().max_age(), Duration::from_millis(500));

    summary.observe(1.0);
    clock.advance(Duration::from_millis(300));
    assert_eq!(summary.snapshot().quantile(0.5), Some(1.0));

    clock.advance(Duration::from_millis(300));
    let snapshot = summary.snapshot();
    assert_eq!(snapshot.count, 1);
    assert!(snapshot.quantile(0.5).unwrap().is_nan());
}

// ============================================================================
// Test: Buffering
// ============================================================================

#[test]
fn test_burst_beyond_buffer_capacity() {
    let (registry, _clock) = registry_with_clock();
    let opts = SummaryOpts::default().with_buf_cap(16);
    let summary = registry.summary("burst", opts).unwrap();

    for i in 0..1_000 {
        summary.observe(f64::from(i));
    }

    let snapshot = summary.snapshot();
    assert_eq!(snapshot.count, 1_000);
    assert_eq!(snapshot.sum, 499_500.0);
}

// ============================================================================
// Test: Concurrency
// ============================================================================

#[test]
fn test_concurrent_observers_and_renderers() {
    let (registry, _clock) = registry_with_clock();
    let summary = registry.summary("concurrent", SummaryOpts::default()).unwrap();

    thread::scope(|scope| {
        for t in 0..8 {
            let summary = Arc::clone(&summary);
            scope.spawn(move || {
                for i in 0..2_000 {
                    summary.observe(1.0);
                    let label = if i % 2 == 0 { "even" } else { "odd" };
                    summary.observe_with_label(label, f64::from(t));
                }
            });
        }
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..20 {
                    let _ = registry.encode();
                }
            });
        }
    });

    let snapshot = summary.snapshot();
    assert_eq!(snapshot.count, 16_000);
    assert_eq!(snapshot.sum, 16_000.0);
    let even = summary.label_snapshot("even").unwrap();
    let odd = summary.label_snapshot("odd").unwrap();
    assert_eq!(even.count + odd.count, 16_000);
}

// ============================================================================
// Test: Configuration Errors
// ============================================================================

#[test]
fn test_invalid_summary_opts_rejected() {
    let registry = Registry::new();
    let result = registry.summary("bad", SummaryOpts::default().with_age_buckets(0));
    assert!(matches!(result, Err(MetricsError::InvalidConfig { .. })));
}

#[test]
fn test_exponential_bucket_helper() {
    let buckets = exponential_buckets(0.001, 2.0, 16).unwrap();
    assert_eq!(buckets.len(), 16);
    assert_eq!(buckets[0], 0.001);
    assert_eq!(buckets[1], 0.002);
    assert!(buckets.windows(2).all(|w| w[0] < w[1]));
}
