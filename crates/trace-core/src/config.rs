//! SDK configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use trace_session::{Category, Logger, SessionConfig, TracingLogger};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Start sampling when `Trace::start` is called. Has no effect on an
    /// instance that is already running.
    pub enabled: bool,
    /// Debug logs
    pub logs: bool,
    /// Time between hardware samples
    pub sampling_interval: Duration,
    /// Delay before the first sample
    pub initial_delay: Duration,
    /// Path to the crash reporter metadata database
    pub crash_store_path: PathBuf,
    /// Batches kept in memory before the oldest is dropped
    pub queue_capacity: usize,
}

impl Config {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            enabled: true,
            logs: true,
            sampling_interval: SessionConfig::DEFAULT_INTERVAL,
            initial_delay: SessionConfig::DEFAULT_INITIAL_DELAY,
            crash_store_path: data_dir.join("crash.db"),
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("trace"))
            .unwrap_or_else(|| PathBuf::from(".trace"))
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.set_enabled_with(enabled, &TracingLogger);
    }

    pub(crate) fn set_enabled_with(&mut self, enabled: bool, logger: &dyn Logger) {
        self.enabled = enabled;

        logger.debug(
            Category::Application,
            &format!("Configuration.enabled has been set to {enabled}"),
        );
        if enabled {
            logger.debug(Category::Launch, "Call `Trace::start` to start the SDK");
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.sampling_interval, self.initial_delay)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
