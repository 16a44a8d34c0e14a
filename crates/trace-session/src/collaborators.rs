//! Injected collaborators of the session manager

use std::sync::Arc;

use serde_json::Value;
use trace_hardware::{HardwareSampler, MetricsBatch};
use trace_storage::CrashStore;

use crate::dispatch::ExecutionContext;
use crate::logger::Logger;
use crate::Result;

/// Outbound queue for finished metric batches.
///
/// `enqueue` must not block; batching and transport are the queue's concern.
pub trait DeliveryQueue: Send + Sync {
    fn enqueue(&self, batch: MetricsBatch);
}

/// Crash reporter side channel. Entries are last-write-wins per key.
pub trait DiagnosticChannel: Send + Sync {
    fn set_snapshot(&self, key: &str, value: Value) -> Result<()>;
}

impl DiagnosticChannel for CrashStore {
    fn set_snapshot(&self, key: &str, value: Value) -> Result<()> {
        self.set_user_info(key, &value)?;
        Ok(())
    }
}

/// Everything the session manager talks to, other than its scheduler
#[derive(Clone)]
pub struct Collaborators {
    pub sampler: Arc<dyn HardwareSampler>,
    pub queue: Arc<dyn DeliveryQueue>,
    pub diagnostics: Arc<dyn DiagnosticChannel>,
    pub logger: Arc<dyn Logger>,
    pub context: Arc<dyn ExecutionContext>,
}
