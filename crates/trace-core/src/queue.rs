//! In-memory delivery queue for metric batches

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use trace_hardware::MetricsBatch;
use trace_session::DeliveryQueue;

/// Bounded FIFO of batches waiting for transport.
///
/// When full, the oldest batch is dropped to make room.
pub struct MetricsQueue {
    capacity: usize,
    batches: Mutex<VecDeque<MetricsBatch>>,
    dropped: AtomicU64,
}

impl MetricsQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            capacity,
            batches: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.lock().is_empty()
    }

    /// Batches discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Take every queued batch, oldest first
    pub fn drain(&self) -> Vec<MetricsBatch> {
        self.batches.lock().drain(..).collect()
    }
}

impl DeliveryQueue for MetricsQueue {
    fn enqueue(&self, batch: MetricsBatch) {
        let mut batches = self.batches.lock();
        batches.push_back(batch);

        if batches.len() > self.capacity {
            let overflow = batches.len() - self.capacity;
            batches.drain(..overflow);
            drop(batches);

            self.dropped.fetch_add(overflow as u64, Ordering::Relaxed);
            tracing::warn!(
                capacity = self.capacity,
                dropped = overflow,
                "Metrics queue full, dropped oldest batch"
            );
        }
    }
}
