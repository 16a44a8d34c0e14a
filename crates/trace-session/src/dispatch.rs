//! Serial execution context
//!
//! All resource mutations run on one context so they never interleave. Jobs
//! dispatched onto a [`SerialQueue`] run one at a time in dispatch order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::error::SessionError;
use crate::Result;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait ExecutionContext: Send + Sync {
    /// Run `job` after every job dispatched before it
    fn dispatch(&self, job: Job);

    /// Enqueue `job` once `delay` has elapsed. Its position in the FIFO is
    /// decided at that moment, not at the time of the call.
    fn dispatch_after(&self, delay: Duration, job: Job);
}

/// Single-worker FIFO queue on the Tokio runtime
#[derive(Clone)]
pub struct SerialQueue {
    label: Arc<str>,
    tx: mpsc::UnboundedSender<Job>,
    handle: Handle,
}

impl SerialQueue {
    /// Spawn the worker on the current Tokio runtime
    pub fn spawn(label: &str) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let label: Arc<str> = Arc::from(label);

        handle.spawn(run_worker(Arc::clone(&label), rx));

        tracing::debug!(queue = %label, "Spawned serial queue");

        Ok(Self { label, tx, handle })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Resolves once every job dispatched before this call has run
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.dispatch(Box::new(move || {
            let _ = done_tx.send(());
        }));
        let _ = done_rx.await;
    }
}

impl ExecutionContext for SerialQueue {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::warn!(queue = %self.label, "Serial queue closed, dropping job");
        }
    }

    fn dispatch_after(&self, delay: Duration, job: Job) {
        if delay.is_zero() {
            self.dispatch(job);
            return;
        }

        let queue = self.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            queue.dispatch(job);
        });
    }
}

async fn run_worker(label: Arc<str>, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!(queue = %label, "Job panicked on serial queue");
        }
    }

    tracing::debug!(queue = %label, "Serial queue stopped");
}
