//! Hardware sampler
//!
//! Combines the individual probes into one [`MetricsBatch`] per tick.

use crate::connectivity::ConnectivityProbe;
use crate::cpu::CpuProbe;
use crate::device::DeviceDescriptor;
use crate::memory::MemoryProbe;
use crate::metric::MetricsBatch;

/// Source of device state for the session manager.
///
/// Implementations never fail outright: a probe that cannot produce a reading
/// is logged and listed in [`MetricsBatch::failed_probes`].
pub trait HardwareSampler: Send + Sync {
    fn device_descriptor(&self) -> DeviceDescriptor;

    fn metrics_batch(&self) -> MetricsBatch;

    /// Name of the active network interface, if any
    fn connectivity_interface(&self) -> Option<String>;
}

/// Sampler backed by the host's procfs/sysctl probes
pub struct SystemSampler {
    cpu: CpuProbe,
    memory: MemoryProbe,
    connectivity: ConnectivityProbe,
    app_version: Option<String>,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self {
            cpu: CpuProbe::new(),
            memory: MemoryProbe::new(),
            connectivity: ConnectivityProbe::new(),
            app_version: None,
        }
    }

    /// Report `version` as the host application's version in every descriptor
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareSampler for SystemSampler {
    fn device_descriptor(&self) -> DeviceDescriptor {
        let device = DeviceDescriptor::detect().with_network(self.connectivity_interface());
        match &self.app_version {
            Some(version) => device.with_app_version(version.clone()),
            None => device,
        }
    }

    fn metrics_batch(&self) -> MetricsBatch {
        let mut batch = MetricsBatch::new();

        match self.cpu.read() {
            Ok(reading) => reading.write_to(&mut batch),
            Err(e) => {
                tracing::debug!(probe = "cpu", error = %e, "Probe failed");
                batch.record_failure("cpu");
            }
        }

        match self.memory.read() {
            Ok(reading) => reading.write_to(&mut batch),
            Err(e) => {
                tracing::debug!(probe = "memory", error = %e, "Probe failed");
                batch.record_failure("memory");
            }
        }

        match self.connectivity.read() {
            Ok(reading) => reading.write_to(&mut batch),
            Err(e) => {
                tracing::debug!(probe = "connectivity", error = %e, "Probe failed");
                batch.record_failure("connectivity");
            }
        }

        batch
    }

    fn connectivity_interface(&self) -> Option<String> {
        match self.connectivity.read() {
            Ok(reading) => reading.interface.filter(|name| !name.is_empty()),
            Err(e) => {
                tracing::debug!(probe = "connectivity", error = %e, "Probe failed");
                None
            }
        }
    }
}
