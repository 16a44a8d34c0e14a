//! Trace Core
//!
//! SDK entry point: configuration, logging setup, the in-memory delivery
//! queue and the [`Trace`] instance that owns a running session.

mod config;
mod error;
mod queue;
mod trace;

pub use config::Config;
pub use error::CoreError;
pub use queue::MetricsQueue;
pub use trace::Trace;

pub use trace_hardware::{DeviceDescriptor, HardwareSampler, MetricsBatch, SystemSampler};
pub use trace_session::{
    Category, Logger, Resource, SessionConfig, SessionError, SessionId, SessionManager,
    SessionStats,
};
pub use trace_storage::{CrashStore, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging. `RUST_LOG` wins over the configuration.
pub fn init_logging(config: &Config) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if config.logs { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed by the host application
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
