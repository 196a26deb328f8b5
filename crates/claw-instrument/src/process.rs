//! Process statistics read from procfs.
//!
//! [`ProcessCollector`] refreshes the standard `process_*` gauges from
//! `/proc/self/stat`, `/proc/self/status`, `/proc/stat` and `/proc/self/fd`
//! each time the registry renders. Resident memory comes from the `VmRSS` line
//! of `status`, which the kernel reports in kB whatever the page size.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::registry::{Collector, Registry};

/// Clock ticks per second assumed for procfs time fields.
pub const CLOCK_TICKS_PER_SEC: f64 = 100.0;

/// Fields of `/proc/<pid>/stat` this collector uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStat {
    /// User-mode CPU time in clock ticks.
    pub utime_ticks: u64,
    /// Kernel-mode CPU time in clock ticks.
    pub stime_ticks: u64,
    /// Number of threads.
    pub num_threads: u64,
    /// Start time after boot in clock ticks.
    pub start_time_ticks: u64,
    /// Virtual memory size in bytes.
    pub vsize_bytes: u64,
    /// Resident set size in pages of the host's page size.
    pub rss_pages: u64,
}

impl ProcessStat {
    /// Total CPU time in seconds.
    #[must_use]
    pub fn cpu_seconds(&self) -> f64 {
        (self.utime_ticks + self.stime_ticks) as f64 / CLOCK_TICKS_PER_SEC
    }
}

fn collection_error(reason: impl Into<String>) -> MetricsError {
    MetricsError::Collection {
        reason: reason.into(),
    }
}

/// Parses the contents of `/proc/<pid>/stat`.
///
/// The command name may contain spaces and parentheses, so fields are counted
/// from the last `)`.
///
/// # Errors
///
/// Returns `MetricsError::Collection` if a field is missing or not a number.
pub fn parse_process_stat(content: &str) -> Result<ProcessStat> {
    let (_, rest) = content
        .rsplit_once(')')
        .ok_or_else(|| collection_error("missing command name in process stat"))?;
    let fields: Vec<&str> = rest.split_whitespace().collect();

    // Index 0 is field 3 (state) of proc(5).
    let field = |index: usize, what: &str| -> Result<u64> {
        let raw = fields
            .get(index)
            .ok_or_else(|| collection_error(format!("process stat is missing {what}")))?;
        raw.parse()
            .map_err(|e| collection_error(format!("invalid {what} '{raw}' in process stat: {e}")))
    };

    Ok(ProcessStat {
        utime_ticks: field(11, "utime")?,
        stime_ticks: field(12, "stime")?,
        num_threads: field(17, "num_threads")?,
        start_time_ticks: field(19, "starttime")?,
        vsize_bytes: field(20, "vsize")?,
        rss_pages: field(21, "rss")?,
    })
}

/// Parses the resident set size in bytes from `/proc/<pid>/status`.
///
/// # Errors
///
/// Returns `MetricsError::Collection` if there is no valid `VmRSS` line.
pub fn parse_status_rss(content: &str) -> Result<u64> {
    let raw = content
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .ok_or_else(|| collection_error("no VmRSS line in process status"))?
        .trim();

    let kb = match raw.split_once(char::is_whitespace) {
        Some((value, unit)) if unit.trim() == "kB" => value,
        _ => return Err(collection_error(format!("unexpected VmRSS value '{raw}'"))),
    };
    kb.parse::<u64>()
        .map(|kb| kb * 1024)
        .map_err(|e| collection_error(format!("invalid VmRSS '{raw}': {e}")))
}

/// Parses the boot time in seconds since the epoch from `/proc/stat`.
///
/// # Errors
///
/// Returns `MetricsError::Collection` if there is no valid `btime` line.
pub fn parse_boot_time(content: &str) -> Result<u64> {
    let line = content
        .lines()
        .find_map(|line| line.strip_prefix("btime "))
        .ok_or_else(|| collection_error("no btime line in system stat"))?;
    line.trim()
        .parse()
        .map_err(|e| collection_error(format!("invalid btime '{}': {e}", line.trim())))
}

/// Collector for the standard process gauges.
///
/// Sets:
/// - `process_cpu_seconds_total`
/// - `process_resident_memory_bytes`
/// - `process_virtual_memory_bytes`
/// - `process_threads`
/// - `process_open_fds`
/// - `process_start_time_seconds`
#[derive(Debug, Clone)]
pub struct ProcessCollector {
    proc_root: PathBuf,
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector {
    /// Creates a collector reading `/proc`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Creates a collector reading a procfs mounted at `proc_root`.
    #[must_use]
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Returns the procfs root this collector reads.
    #[must_use]
    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    fn read(&self, relative: &str) -> Result<String> {
        let path = self.proc_root.join(relative);
        fs::read_to_string(&path)
            .map_err(|e| collection_error(format!("failed to read '{}': {e}", path.display())))
    }

    fn open_fds(&self) -> Result<usize> {
        let path = self.proc_root.join("self/fd");
        let entries = fs::read_dir(&path)
            .map_err(|e| collection_error(format!("failed to list '{}': {e}", path.display())))?;
        Ok(entries.filter_map(std::result::Result::ok).count())
    }
}

impl Collector for ProcessCollector {
    fn collect(&self, registry: &Registry) -> Result<()> {
        if !self.proc_root.exists() {
            debug!(
                proc_root = %self.proc_root.display(),
                "procfs not available, skipping process metrics"
            );
            return Ok(());
        }

        let stat = parse_process_stat(&self.read("self/stat")?)?;
        let resident_bytes = parse_status_rss(&self.read("self/status")?)?;
        let boot_time = parse_boot_time(&self.read("stat")?)?;
        let open_fds = self.open_fds()?;

        registry
            .gauge("process_cpu_seconds_total")?
            .set(stat.cpu_seconds());
        registry
            .gauge("process_resident_memory_bytes")?
            .set(resident_bytes as f64);
        registry
            .gauge("process_virtual_memory_bytes")?
            .set(stat.vsize_bytes as f64);
        registry
            .gauge("process_threads")?
            .set(stat.num_threads as f64);
        registry.gauge("process_open_fds")?.set(open_fds as f64);
        registry.gauge("process_start_time_seconds")?.set(
            boot_time as f64 + stat.start_time_ticks as f64 / CLOCK_TICKS_PER_SEC,
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ProcessCollector"
    }
}
