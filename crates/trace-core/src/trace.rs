//! SDK entry point
//!
//! Wires the crash store, delivery queue, system sampler, serial context and
//! repeater into one running session.

use std::sync::Arc;

use trace_hardware::{HardwareSampler, SystemSampler};
use trace_session::{Collaborators, Repeater, SerialQueue, SessionManager, TracingLogger};
use trace_storage::CrashStore;

use crate::config::Config;
use crate::error::CoreError;
use crate::queue::MetricsQueue;
use crate::Result;

/// Running SDK instance
pub struct Trace {
    config: Config,
    crash_store: CrashStore,
    queue: Arc<MetricsQueue>,
    context: SerialQueue,
    session: SessionManager,
}

impl Trace {
    /// Start sampling with the host's probes. Must be called inside a Tokio
    /// runtime.
    pub fn start(config: Config) -> Result<Self> {
        Self::start_with_sampler(config, Arc::new(SystemSampler::new()))
    }

    pub fn start_with_sampler(
        config: Config,
        sampler: Arc<dyn HardwareSampler>,
    ) -> Result<Self> {
        if !config.enabled {
            tracing::info!("Trace disabled, not starting");
            return Err(CoreError::Disabled);
        }

        let crash_store = CrashStore::open(&config.crash_store_path)?;
        let queue = Arc::new(MetricsQueue::new(config.queue_capacity));
        let context = SerialQueue::spawn("trace.main")?;

        let session_config = config.session_config();
        let collaborators = Collaborators {
            sampler,
            queue: queue.clone(),
            diagnostics: Arc::new(crash_store.clone()),
            logger: Arc::new(TracingLogger),
            context: Arc::new(context.clone()),
        };
        let session = SessionManager::start(
            session_config,
            Box::new(Repeater::new(session_config.interval)),
            collaborators,
        )?;

        tracing::info!(
            crash_store = %config.crash_store_path.display(),
            queue_capacity = config.queue_capacity,
            "Trace started"
        );

        Ok(Self {
            config,
            crash_store,
            queue,
            context,
            session,
        })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn queue(&self) -> &MetricsQueue {
        &self.queue
    }

    pub fn crash_store(&self) -> &CrashStore {
        &self.crash_store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start a new session, e.g. when the app returns to the foreground
    pub fn restart_session(&self) {
        self.session.restart();
    }

    /// Resolves once every resource update dispatched so far has been applied
    pub async fn flush(&self) {
        self.context.flush().await;
    }
}
