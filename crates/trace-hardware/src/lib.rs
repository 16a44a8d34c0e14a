//! Trace Hardware Probes
//!
//! Point-in-time readings of the host device:
//! - CPU usage and load averages
//! - Memory pressure and app resident size
//! - Connectivity (active network interface)
//! - Device descriptor (model, OS, locale)
//!
//! Probes are best-effort. A probe that cannot produce a reading reports a
//! [`ProbeError`]; the [`SystemSampler`] records the failure in the batch and
//! carries on with whatever the other probes produced.

mod connectivity;
mod cpu;
mod device;
mod error;
mod memory;
mod metric;
mod procfs;
mod sampler;

pub use connectivity::{Connectivity, ConnectivityProbe};
pub use cpu::{CpuProbe, CpuReading};
pub use device::DeviceDescriptor;
pub use error::ProbeError;
pub use memory::{MemoryProbe, MemoryReading};
pub use metric::{Metric, MetricsBatch};
pub use sampler::{HardwareSampler, SystemSampler};

pub type Result<T> = std::result::Result<T, ProbeError>;
