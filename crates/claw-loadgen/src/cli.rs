//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::Parser;

/// Drive claw-instrument metrics from many threads and print the exposition.
#[derive(Parser, Debug, Clone)]
#[command(name = "claw-loadgen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Number of observer threads.
    #[arg(short, long, env = "CLAW_LOADGEN_THREADS", default_value_t = 4)]
    pub threads: usize,

    /// Observations per thread.
    #[arg(short = 'n', long, env = "CLAW_LOADGEN_OBSERVATIONS", default_value_t = 100_000)]
    pub observations: u64,

    /// Number of distinct instance labels; 0 observes the default instance only.
    #[arg(short, long, default_value_t = 0)]
    pub labels: usize,

    /// Milliseconds between printed expositions.
    #[arg(short, long, env = "CLAW_LOADGEN_INTERVAL_MS", default_value_t = 1_000)]
    pub interval_ms: u64,

    /// Summary window length in seconds.
    #[arg(long, default_value_t = 600)]
    pub max_age_secs: u64,

    /// Number of age buckets in the summary window.
    #[arg(long, default_value_t = 5)]
    pub age_buckets: u32,

    /// Mean of the generated latencies in seconds.
    #[arg(long, default_value_t = 0.05)]
    pub mean_latency: f64,

    /// Microseconds each thread pauses between observations.
    #[arg(long, default_value_t = 0)]
    pub pause_us: u64,

    /// Seed for the latency generator.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// JSON file with summary options; replaces --max-age-secs and --age-buckets.
    #[arg(short, long, env = "CLAW_LOADGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also export process statistics from procfs.
    #[arg(long)]
    pub process: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["claw-loadgen"]).unwrap();
        assert_eq!(cli.threads, 4);
        assert_eq!(cli.observations, 100_000);
        assert_eq!(cli.labels, 0);
        assert_eq!(cli.max_age_secs, 600);
        assert_eq!(cli.age_buckets, 5);
        assert!(cli.config.is_none());
        assert!(!cli.process);
    }

    #[test]
    fn flags() {
        let cli = Cli::try_parse_from([
            "claw-loadgen",
            "-t",
            "8",
            "-n",
            "500",
            "--labels",
            "3",
            "--interval-ms",
            "250",
            "--process",
        ])
        .unwrap();
        assert_eq!(cli.threads, 8);
        assert_eq!(cli.observations, 500);
        assert_eq!(cli.labels, 3);
        assert_eq!(cli.interval_ms, 250);
        assert!(cli.process);
    }

    #[test]
    fn rejects_non_numeric_threads() {
        assert!(Cli::try_parse_from(["claw-loadgen", "--threads", "many"]).is_err());
    }
}
