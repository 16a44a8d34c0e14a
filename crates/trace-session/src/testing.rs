//! In-memory collaborators for tests

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trace_hardware::{DeviceDescriptor, HardwareSampler, MetricsBatch};

use crate::collaborators::{Collaborators, DeliveryQueue, DiagnosticChannel};
use crate::dispatch::SerialQueue;
use crate::error::SessionError;
use crate::logger::{Category, Logger};
use crate::scheduler::{Callback, Scheduler, SchedulerState};
use crate::Result;

pub fn device(network: Option<&str>) -> DeviceDescriptor {
    DeviceDescriptor {
        model: "TestDevice1,1".to_string(),
        os_name: "testos".to_string(),
        os_version: "1.0".to_string(),
        arch: "aarch64".to_string(),
        locale: "en_GB".to_string(),
        cpu_count: 4,
        app_version: None,
        carrier: None,
        network: network.map(str::to_string),
    }
}

#[derive(Default)]
pub struct FakeSampler {
    pub device_network: Mutex<Option<String>>,
    pub interface: Mutex<Option<String>>,
    pub failing: AtomicBool,
}

impl FakeSampler {
    pub fn set_device_network(&self, network: Option<&str>) {
        *self.device_network.lock() = network.map(str::to_string);
    }

    pub fn set_interface(&self, interface: Option<&str>) {
        *self.interface.lock() = interface.map(str::to_string);
    }
}

impl HardwareSampler for FakeSampler {
    fn device_descriptor(&self) -> DeviceDescriptor {
        device(self.device_network.lock().as_deref())
    }

    fn metrics_batch(&self) -> MetricsBatch {
        let mut batch = MetricsBatch::new();
        if self.failing.load(Ordering::SeqCst) {
            batch.record_failure("cpu");
            batch.record_failure("memory");
        } else {
            batch.push("cpu.usage_pct", 12.0, "pct");
        }
        batch
    }

    fn connectivity_interface(&self) -> Option<String> {
        self.interface.lock().clone()
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    pub batches: Mutex<Vec<MetricsBatch>>,
}

impl RecordingQueue {
    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }
}

impl DeliveryQueue for RecordingQueue {
    fn enqueue(&self, batch: MetricsBatch) {
        self.batches.lock().push(batch);
    }
}

#[derive(Default)]
pub struct RecordingChannel {
    pub entries: Mutex<Vec<(String, Value)>>,
    pub failing: AtomicBool,
}

impl RecordingChannel {
    pub fn last(&self) -> Option<(String, Value)> {
        self.entries.lock().last().cloned()
    }
}

impl DiagnosticChannel for RecordingChannel {
    fn set_snapshot(&self, key: &str, value: Value) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SessionError::Storage(trace_storage::StorageError::Io(
                std::io::Error::other("side channel unavailable"),
            )));
        }
        self.entries.lock().push((key.to_string(), value));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingLogger {
    pub lines: Mutex<Vec<(Category, String)>>,
}

impl RecordingLogger {
    pub fn count(&self, message: &str) -> usize {
        self.lines.lock().iter().filter(|(_, m)| m == message).count()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.lines.lock().iter().any(|(c, _)| *c == category)
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, category: Category, message: &str) {
        self.lines.lock().push((category, message.to_string()));
    }
}

/// Scheduler whose ticks are fired by hand
#[derive(Clone)]
pub struct ManualScheduler {
    inner: Arc<ManualInner>,
}

struct ManualInner {
    interval: Mutex<Duration>,
    state: Mutex<SchedulerState>,
    callback: Mutex<Option<Callback>>,
    refuse_running: AtomicBool,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ManualInner {
                interval: Mutex::new(Duration::ZERO),
                state: Mutex::new(SchedulerState::Paused),
                callback: Mutex::new(None),
                refuse_running: AtomicBool::new(false),
            }),
        }
    }

    pub fn refuse_running(&self, refuse: bool) {
        self.inner.refuse_running.store(refuse, Ordering::SeqCst);
    }

    pub fn interval(&self) -> Duration {
        *self.inner.interval.lock()
    }

    /// Fire one tick if running
    pub fn tick(&self) {
        if *self.inner.state.lock() != SchedulerState::Running {
            return;
        }
        let callback = self.inner.callback.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl Scheduler for ManualScheduler {
    fn configure(&self, interval: Duration) {
        *self.inner.interval.lock() = interval;
    }

    fn set_state(&self, state: SchedulerState) -> Result<()> {
        if state == SchedulerState::Running && self.inner.refuse_running.load(Ordering::SeqCst) {
            return Err(SessionError::SchedulerArm("refused".into()));
        }
        *self.inner.state.lock() = state;
        Ok(())
    }

    fn set_callback(&self, callback: Callback) {
        *self.inner.callback.lock() = Some(callback);
    }

    fn state(&self) -> SchedulerState {
        *self.inner.state.lock()
    }
}

/// Fakes wired together around a real serial queue
pub struct Harness {
    pub sampler: Arc<FakeSampler>,
    pub queue: Arc<RecordingQueue>,
    pub channel: Arc<RecordingChannel>,
    pub logger: Arc<RecordingLogger>,
    pub context: SerialQueue,
    pub scheduler: ManualScheduler,
}

impl Harness {
    /// Must be called inside a Tokio runtime
    pub fn new() -> Self {
        Self {
            sampler: Arc::new(FakeSampler::default()),
            queue: Arc::new(RecordingQueue::default()),
            channel: Arc::new(RecordingChannel::default()),
            logger: Arc::new(RecordingLogger::default()),
            context: SerialQueue::spawn("main").expect("runtime"),
            scheduler: ManualScheduler::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            sampler: self.sampler.clone(),
            queue: self.queue.clone(),
            diagnostics: self.channel.clone(),
            logger: self.logger.clone(),
            context: Arc::new(self.context.clone()),
        }
    }
}
