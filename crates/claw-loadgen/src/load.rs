//! The load run itself.
//!
//! Worker threads draw exponentially distributed latencies and record each
//! one in a summary, a histogram and a counter. The calling thread renders
//! the registry every interval until the workers finish, then once more.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, ensure};
use claw_instrument::{DEFAULT_BUCKETS, ProcessCollector, Registry, SummaryOpts};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::cli::Cli;

/// Outcome of a load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Observations recorded across all threads.
    pub observations: u64,
    /// Expositions written, including the final one.
    pub renders: usize,
}

/// Builds the summary options from a config file or the window flags.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded or the options are invalid.
pub fn summary_opts(cli: &Cli) -> anyhow::Result<SummaryOpts> {
    let opts = match &cli.config {
        Some(path) => SummaryOpts::from_file(path)
            .with_context(|| format!("failed to load summary options from {}", path.display()))?,
        None => SummaryOpts::default()
            .with_max_age(Duration::from_secs(cli.max_age_secs))
            .with_age_buckets(cli.age_buckets),
    };
    opts.validate().context("invalid summary options")?;
    Ok(opts)
}

/// Draws an exponentially distributed latency with the given mean.
fn next_latency(rng: &mut StdRng, mean: f64) -> f64 {
    let u: f64 = rng.gen_range(0.0..1.0);
    -mean * (1.0 - u).ln()
}

/// Runs the load described by `cli`, writing expositions to `out`.
///
/// # Errors
///
/// Returns an error if the arguments are invalid, a metric cannot be
/// registered, or writing to `out` fails.
pub fn run<W: Write>(cli: &Cli, registry: &Registry, out: &mut W) -> anyhow::Result<LoadReport> {
    ensure!(cli.threads > 0, "--threads must be at least 1");
    ensure!(
        cli.mean_latency.is_finite() && cli.mean_latency > 0.0,
        "--mean-latency must be positive"
    );

    let opts = summary_opts(cli)?;
    let latency = registry
        .summary("loadgen_latency_seconds", opts)
        .context("failed to register latency summary")?;
    let buckets = registry
        .histogram("loadgen_latency_histogram_seconds", &DEFAULT_BUCKETS)
        .context("failed to register latency histogram")?;
    let observed = registry
        .counter("loadgen_observations_total")
        .context("failed to register observation counter")?;
    let active = registry
        .gauge("loadgen_active_workers")
        .context("failed to register worker gauge")?;
    if cli.process {
        registry.register_collector(ProcessCollector::new());
    }

    info!(
        threads = cli.threads,
        observations = cli.observations,
        labels = cli.labels,
        "starting load"
    );

    let started = Instant::now();
    let interval = Duration::from_millis(cli.interval_ms.max(1));
    let pause = Duration::from_micros(cli.pause_us);
    let finished = AtomicUsize::new(0);
    let mut renders = 0;

    thread::scope(|scope| -> anyhow::Result<()> {
        for worker in 0..cli.threads {
            let label = (cli.labels > 0).then(|| format!("worker-{}", worker % cli.labels));
            let (latency, buckets, observed, active, finished) =
                (&latency, &buckets, &observed, &active, &finished);
            let seed = cli.seed.wrapping_add(worker as u64);

            scope.spawn(move || {
                active.inc();
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..cli.observations {
                    let value = next_latency(&mut rng, cli.mean_latency);
                    match &label {
                        Some(label) => latency.observe_with_label(label, value),
                        None => latency.observe(value),
                    }
                    buckets.observe(value);
                    observed.inc();
                    if !pause.is_zero() {
                        thread::sleep(pause);
                    }
                }
                active.dec();
                finished.fetch_add(1, Ordering::Release);
                debug!(worker, "worker finished");
            });
        }

        let mut next_render = Instant::now() + interval;
        while finished.load(Ordering::Acquire) < cli.threads {
            thread::sleep(Duration::from_millis(1).min(interval));
            if Instant::now() >= next_render {
                registry.write_to(out).context("failed to write exposition")?;
                out.flush()?;
                renders += 1;
                next_render += interval;
            }
        }
        Ok(())
    })?;

    registry.write_to(out).context("failed to write exposition")?;
    out.flush()?;
    renders += 1;

    let observations = cli.observations * cli.threads as u64;
    info!(
        observations,
        renders,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "load finished"
    );

    Ok(LoadReport {
        observations,
        renders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write as _;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["claw-loadgen"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn line_value(output: &str, prefix: &str) -> Option<f64> {
        output
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(prefix))
            .and_then(|rest| rest.trim().parse().ok())
    }

    #[test]
    fn latencies_are_positive_with_expected_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<f64> = (0..20_000).map(|_| next_latency(&mut rng, 0.05)).collect();
        assert!(samples.iter().all(|v| *v >= 0.0));
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((mean - 0.05).abs() < 0.005, "mean {mean}");
    }

    #[test]
    fn run_counts_every_observation() {
        let registry = Registry::new();
        let mut out = Vec::new();
        let report = run(&cli(&["-t", "3", "-n", "1000"]), &registry, &mut out).unwrap();

        assert_eq!(report.observations, 3_000);
        assert!(report.renders >= 1);

        let output = String::from_utf8(out).unwrap();
        assert_eq!(line_value(&output, "loadgen_latency_seconds_count "), Some(3_000.0));
        assert_eq!(line_value(&output, "loadgen_observations_total "), Some(3_000.0));
        assert_eq!(
            line_value(&output, "loadgen_latency_histogram_seconds_count "),
            Some(3_000.0)
        );
        assert_eq!(line_value(&output, "loadgen_active_workers "), Some(0.0));
    }

    #[test]
    fn run_with_labels() {
        let registry = Registry::new();
        let mut out = Vec::new();
        run(&cli(&["-t", "4", "-n", "100", "--labels", "2"]), &registry, &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        assert_eq!(
            line_value(&output, "loadgen_latency_seconds_count{i=\"worker-0\"} "),
            Some(200.0)
        );
        assert_eq!(
            line_value(&output, "loadgen_latency_seconds_count{i=\"worker-1\"} "),
            Some(200.0)
        );
        assert_eq!(line_value(&output, "loadgen_latency_seconds_count "), Some(0.0));
    }

    #[test]
    fn periodic_renders_while_running() {
        let registry = Registry::new();
        let mut out = Vec::new();
        let report = run(
            &cli(&["-t", "1", "-n", "50", "--pause-us", "1000", "--interval-ms", "5"]),
            &registry,
            &mut out,
        )
        .unwrap();
        assert!(report.renders > 1, "renders {}", report.renders);
    }

    #[test]
    fn zero_threads_is_rejected() {
        let registry = Registry::new();
        let result = run(&cli(&["-t", "0"]), &registry, &mut Vec::new());
        assert!(result.is_err());
    }

    #[test]
    fn config_file_replaces_window_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_age_secs": 30, "age_buckets": 3}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let opts = summary_opts(&cli(&["--config", &path, "--age-buckets", "9"])).unwrap();
        assert_eq!(opts.age_buckets, 3);
        assert_eq!(opts.max_age(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_window_flags_are_rejected() {
        assert!(summary_opts(&cli(&["--age-buckets", "0"])).is_err());
    }
}
