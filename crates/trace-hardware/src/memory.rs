//! Memory probe

use crate::error::ProbeError;
use crate::metric::MetricsBatch;
use crate::procfs::parse_kv_number;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryReading {
    pub total_bytes: u64,
    pub available_bytes: u64,
    /// Resident set size of this process, when known
    pub app_resident_bytes: Option<u64>,
}

impl MemoryReading {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    pub fn used_pct(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes() as f64 / self.total_bytes as f64 * 100.0
    }

    pub fn write_to(&self, batch: &mut MetricsBatch) {
        batch.push("memory.total_bytes", self.total_bytes as f64, "bytes");
        batch.push("memory.available_bytes", self.available_bytes as f64, "bytes");
        batch.push("memory.used_bytes", self.used_bytes() as f64, "bytes");
        batch.push("memory.used_pct", self.used_pct(), "pct");
        if let Some(rss) = self.app_resident_bytes {
            batch.push("memory.app_resident_bytes", rss as f64, "bytes");
        }
    }
}

/// Parse `/proc/meminfo`. Older kernels lack `MemAvailable`; fall back to
/// free + buffers + cached.
pub(crate) fn parse_meminfo(raw: &str) -> Result<(u64, u64)> {
    let mut total = None;
    let mut available = None;
    let mut fallback = 0.0;

    for line in raw.lines() {
        let Some((key, kib)) = parse_kv_number(line) else {
            continue;
        };
        match key {
            "MemTotal" => total = Some(kib),
            "MemAvailable" => available = Some(kib),
            "MemFree" | "Buffers" | "Cached" => fallback += kib,
            _ => {}
        }
    }

    let total = total.ok_or_else(|| ProbeError::parse("/proc/meminfo", "missing MemTotal"))?;
    let available = available.unwrap_or(fallback);

    Ok(((total * 1024.0) as u64, (available * 1024.0) as u64))
}

/// Resident pages from `/proc/self/statm` (second field), in bytes
pub(crate) fn parse_statm(raw: &str, page_size: u64) -> Option<u64> {
    raw.split_whitespace()
        .nth(1)
        .and_then(|v| v.parse::<u64>().ok())
        .map(|pages| pages * page_size)
}

pub struct MemoryProbe;

impl MemoryProbe {
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "linux")]
    pub fn read(&self) -> Result<MemoryReading> {
        let (total_bytes, available_bytes) = parse_meminfo(&crate::procfs::read("/proc/meminfo")?)?;
        let app_resident_bytes = crate::procfs::read_trimmed("/proc/self/statm")
            .and_then(|raw| parse_statm(&raw, page_size()));

        Ok(MemoryReading {
            total_bytes,
            available_bytes,
            app_resident_bytes,
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn read(&self) -> Result<MemoryReading> {
        Err(ProbeError::Unsupported("memory"))
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
fn page_size() -> u64 {
    // SAFETY: `sysconf` is thread-safe for this query and has no side effects.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meminfo() {
        let raw = "MemTotal:        1000 kB\nMemFree:          100 kB\nMemAvailable:     400 kB\n";
        let (total, available) = parse_meminfo(raw).unwrap();
        assert_eq!(total, 1000 * 1024);
        assert_eq!(available, 400 * 1024);
    }

    #[test]
    fn test_parse_meminfo_without_available() {
        let raw = "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: 50 kB\nCached: 250 kB\n";
        let (_, available) = parse_meminfo(raw).unwrap();
        assert_eq!(available, 400 * 1024);
    }

    #[test]
    fn test_parse_meminfo_missing_total() {
        assert!(parse_meminfo("MemFree: 100 kB\n").is_err());
    }

    #[test]
    fn test_parse_statm() {
        assert_eq!(parse_statm("2000 300 100 1 0 500 0", 4096), Some(300 * 4096));
        assert_eq!(parse_statm("", 4096), None);
    }

    #[test]
    fn test_used_bytes_and_pct() {
        let reading = MemoryReading {
            total_bytes: 1000,
            available_bytes: 250,
            app_resident_bytes: None,
        };
        assert_eq!(reading.used_bytes(), 750);
        assert!((reading.used_pct() - 75.0).abs() < 1e-9);

        let mut batch = MetricsBatch::new();
        reading.write_to(&mut batch);
        assert!(batch.get("memory.app_resident_bytes").is_none());
        assert_eq!(batch.get("memory.used_bytes").unwrap().value, 750.0);
    }
}
