//! Connectivity probe
//!
//! Resolves the interface carrying the default route. When no default route
//! exists the first non-loopback interface with traffic is used instead.

use crate::metric::MetricsBatch;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connectivity {
    /// Interface name, e.g. `wlan0`, `en0`
    pub interface: Option<String>,
    /// Non-loopback interfaces known to the kernel
    pub interface_count: usize,
}

impl Connectivity {
    pub fn is_reachable(&self) -> bool {
        self.interface.is_some()
    }

    pub fn write_to(&self, batch: &mut MetricsBatch) {
        batch.push(
            "connectivity.reachable",
            if self.is_reachable() { 1.0 } else { 0.0 },
            "bool",
        );
        batch.push(
            "connectivity.interfaces",
            self.interface_count as f64,
            "count",
        );
    }
}

/// Interface of the first default route (destination `00000000`) in
/// `/proc/net/route`
pub(crate) fn parse_default_route(raw: &str) -> Option<String> {
    raw.lines().skip(1).find_map(|line| {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        let destination = fields.next()?;
        (destination == "00000000").then(|| iface.to_string())
    })
}

/// Non-loopback interfaces from `/proc/net/dev`, with received bytes
pub(crate) fn parse_net_dev(raw: &str) -> Vec<(String, u64)> {
    raw.lines()
        .skip(2)
        .filter_map(|line| {
            let (iface, stats) = line.split_once(':')?;
            let iface = iface.trim();
            if iface == "lo" || iface.is_empty() {
                return None;
            }
            let rx_bytes = stats
                .split_whitespace()
                .next()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            Some((iface.to_string(), rx_bytes))
        })
        .collect()
}

pub struct ConnectivityProbe;

impl ConnectivityProbe {
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "linux")]
    pub fn read(&self) -> Result<Connectivity> {
        let interfaces = parse_net_dev(&crate::procfs::read("/proc/net/dev")?);
        let interface = crate::procfs::read_trimmed("/proc/net/route")
            .and_then(|raw| parse_default_route(&raw))
            .or_else(|| {
                interfaces
                    .iter()
                    .find(|(_, rx)| *rx > 0)
                    .map(|(name, _)| name.clone())
            });

        Ok(Connectivity {
            interface,
            interface_count: interfaces.len(),
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn read(&self) -> Result<Connectivity> {
        Err(crate::ProbeError::Unsupported("connectivity"))
    }
}

impl Default for ConnectivityProbe {
    fn default() -> Self {
        Self::new()
    }
}
