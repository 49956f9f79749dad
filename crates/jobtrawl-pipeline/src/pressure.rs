//! Resource-pressure telemetry for the fan-out back-off.

use std::path::PathBuf;
use std::sync::Arc;

/// Reports how much of the machine's memory is in use.
pub trait ResourceMonitor: Send + Sync {
    /// Memory usage in percent, or `None` when telemetry is unavailable.
    fn memory_usage_percent(&self) -> Option<f64>;
}

/// Reads `MemTotal` and `MemAvailable` from `/proc/meminfo`.
#[derive(Debug, Clone)]
pub struct ProcMeminfoMonitor {
    path: PathBuf,
}

impl Default for ProcMeminfoMonitor {
    fn default() -> Self {
        Self::with_path("/proc/meminfo")
    }
}

impl ProcMeminfoMonitor {
    /// Read from a meminfo-formatted file at `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResourceMonitor for ProcMeminfoMonitor {
    fn memory_usage_percent(&self) -> Option<f64> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        parse_meminfo(&contents)
    }
}

/// Always reports "unknown"; the fan-out then relies on its fixed bound alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl ResourceMonitor for NoopMonitor {
    fn memory_usage_percent(&self) -> Option<f64> {
        None
    }
}

/// `/proc/meminfo` when present, otherwise [`NoopMonitor`].
#[must_use]
pub fn default_monitor() -> Arc<dyn ResourceMonitor> {
    let proc = ProcMeminfoMonitor::default();
    if proc.memory_usage_percent().is_some() {
        Arc::new(proc)
    } else {
        tracing::debug!("memory telemetry unavailable, resource back-off disabled");
        Arc::new(NoopMonitor)
    }
}

#[allow(clippy::cast_precision_loss)]
fn parse_meminfo(contents: &str) -> Option<f64> {
    let field = |name: &str| -> Option<u64> {
        contents
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|kb| kb.parse().ok())
    };

    let total = field("MemTotal")?;
    let available = field("MemAvailable")?;
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(available);
    Some(used as f64 / total as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MEMINFO: &str = "MemTotal:       16000000 kB\n\
                           MemFree:         2000000 kB\n\
                           MemAvailable:    4000000 kB\n\
                           Buffers:          100000 kB\n";

    #[test]
    fn test_parse_meminfo() {
        let percent = parse_meminfo(MEMINFO).expect("parse meminfo");
        assert!((percent - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_meminfo_missing_field() {
        assert!(parse_meminfo("MemTotal: 100 kB\n").is_none());
        assert!(parse_meminfo("MemTotal: 0 kB\nMemAvailable: 0 kB\n").is_none());
    }

    #[test]
    fn test_monitor_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(MEMINFO.as_bytes()).expect("write meminfo");

        let monitor = ProcMeminfoMonitor::with_path(file.path());
        assert!(monitor.memory_usage_percent().is_some());

        let missing = ProcMeminfoMonitor::with_path("/nonexistent/meminfo");
        assert!(missing.memory_usage_percent().is_none());
    }

    #[test]
    fn test_noop_monitor() {
        assert!(NoopMonitor.memory_usage_percent().is_none());
    }
}
