//! CPU probe
//!
//! Usage is computed from `/proc/stat` jiffy deltas between two consecutive
//! readings. The first reading has no baseline and reports the average since
//! boot.

use parking_lot::Mutex;

use crate::error::ProbeError;
use crate::metric::MetricsBatch;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuReading {
    /// Busy share of all CPUs since the previous reading, 0..=100
    pub usage_pct: f64,
    pub load_1m: Option<f64>,
    pub load_5m: Option<f64>,
    pub load_15m: Option<f64>,
    pub cpu_count: usize,
}

impl CpuReading {
    pub fn write_to(&self, batch: &mut MetricsBatch) {
        batch.push("cpu.usage_pct", self.usage_pct, "pct");
        batch.push("cpu.count", self.cpu_count as f64, "count");
        if let Some(v) = self.load_1m {
            batch.push("cpu.load_1m", v, "load");
        }
        if let Some(v) = self.load_5m {
            batch.push("cpu.load_5m", v, "load");
        }
        if let Some(v) = self.load_15m {
            batch.push("cpu.load_15m", v, "load");
        }
    }
}

/// Aggregate jiffies from the `cpu ` line of `/proc/stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

impl CpuTimes {
    pub(crate) fn parse(stat: &str) -> Result<Self> {
        let line = stat
            .lines()
            .find_map(|l| l.strip_prefix("cpu "))
            .ok_or_else(|| ProbeError::parse("/proc/stat", "missing aggregate cpu line"))?;

        let fields: Vec<u64> = line
            .split_whitespace()
            .filter_map(|s| s.parse::<u64>().ok())
            .collect();
        if fields.len() < 4 {
            return Err(ProbeError::parse("/proc/stat", "too few cpu fields"));
        }

        // idle + iowait count as not busy
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        // guest time is already folded into user/nice
        let total = fields.iter().take(8).sum();

        Ok(Self { idle, total })
    }

    pub(crate) fn usage_since(&self, previous: Option<CpuTimes>) -> f64 {
        let (idle, total) = match previous {
            Some(prev) if self.total > prev.total => (
                self.idle.saturating_sub(prev.idle),
                self.total - prev.total,
            ),
            _ => (self.idle, self.total),
        };
        if total == 0 {
            return 0.0;
        }
        let busy = total.saturating_sub(idle) as f64;
        (busy / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

pub struct CpuProbe {
    previous: Mutex<Option<CpuTimes>>,
}

impl CpuProbe {
    pub fn new() -> Self {
        Self {
            previous: Mutex::new(None),
        }
    }

    pub fn read(&self) -> Result<CpuReading> {
        let times = current_times()?;
        let usage_pct = {
            let mut previous = self.previous.lock();
            let usage = times.usage_since(*previous);
            *previous = Some(times);
            usage
        };

        let (load_1m, load_5m, load_15m) = load_average();

        Ok(CpuReading {
            usage_pct,
            load_1m,
            load_5m,
            load_15m,
            cpu_count: cpu_count(),
        })
    }
}

impl Default for CpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(target_os = "linux")]
fn current_times() -> Result<CpuTimes> {
    CpuTimes::parse(&crate::procfs::read("/proc/stat")?)
}

#[cfg(not(target_os = "linux"))]
fn current_times() -> Result<CpuTimes> {
    Err(ProbeError::Unsupported("cpu"))
}

fn load_average() -> (Option<f64>, Option<f64>, Option<f64>) {
    #[cfg(unix)]
    {
        let mut values = [0.0_f64; 3];
        // SAFETY: `getloadavg` writes at most 3 doubles into the buffer.
        let n = unsafe { libc::getloadavg(values.as_mut_ptr(), 3) };
        if n <= 0 {
            (None, None, None)
        } else {
            (
                Some(values[0]),
                (n > 1).then_some(values[1]),
                (n > 2).then_some(values[2]),
            )
        }
    }
    #[cfg(not(unix))]
    {
        (None, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "cpu  100 0 50 800 50 0 0 0 0 0\ncpu0 50 0 25 400 25 0 0 0 0 0\nintr 1 2 3\n";

    #[test]
    fn test_parse_aggregate_line() {
        let times = CpuTimes::parse(STAT).unwrap();
        assert_eq!(times.idle, 850);
        assert_eq!(times.total, 1000);
    }

    #[test]
    fn test_parse_rejects_missing_line() {
        let err = CpuTimes::parse("intr 1 2 3\n").unwrap_err();
        assert!(matches!(err, ProbeError::Parse { .. }));
    }

    #[test]
    fn test_usage_without_baseline_is_since_boot() {
        let times = CpuTimes::parse(STAT).unwrap();
        assert!((times.usage_since(None) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_usage_from_delta() {
        let before = CpuTimes {
            idle: 850,
            total: 1000,
        };
        let after = CpuTimes {
            idle: 900,
            total: 1200,
        };
        // 200 jiffies elapsed, 50 idle -> 75% busy
        assert!((after.usage_since(Some(before)) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_usage_with_stalled_counters_falls_back() {
        let times = CpuTimes {
            idle: 0,
            total: 0,
        };
        assert_eq!(times.usage_since(Some(times)), 0.0);
    }

    #[test]
    fn test_reading_writes_metrics() {
        let reading = CpuReading {
            usage_pct: 42.0,
            load_1m: Some(0.5),
            load_5m: None,
            load_15m: None,
            cpu_count: 8,
        };
        let mut batch = MetricsBatch::new();
        reading.write_to(&mut batch);

        assert_eq!(batch.get("cpu.usage_pct").unwrap().value, 42.0);
        assert_eq!(batch.get("cpu.count").unwrap().value, 8.0);
        assert_eq!(batch.get("cpu.load_1m").unwrap().value, 0.5);
        assert!(batch.get("cpu.load_5m").is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_probe_reads_host() {
        let probe = CpuProbe::new();
        let reading = probe.read().unwrap();
        assert!((0.0..=100.0).contains(&reading.usage_pct));
        assert!(reading.cpu_count > 0);
    }
}
