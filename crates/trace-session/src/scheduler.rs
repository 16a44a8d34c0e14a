//! Periodic sampling scheduler
//!
//! ```text
//! Paused
//!   ↓ set_state(Running)
//! Running  (callback fires every interval)
//!   ↓ set_state(Paused)
//! Paused
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::SessionError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Paused,
    Running,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Paused => "paused",
            SchedulerState::Running => "running",
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Periodic callback primitive driven by the session manager
pub trait Scheduler: Send + Sync {
    fn configure(&self, interval: Duration);

    /// Switch state. `Running` while already running is a no-op.
    fn set_state(&self, state: SchedulerState) -> Result<()>;

    fn set_callback(&self, callback: Callback);

    fn state(&self) -> SchedulerState;
}

/// Smallest interval the repeater accepts; Tokio intervals cannot be zero
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Tokio-backed [`Scheduler`].
///
/// The first tick fires one full interval after the repeater starts running.
/// Ticks missed while a callback runs long are delayed, not replayed.
pub struct Repeater {
    interval: Mutex<Duration>,
    callback: Arc<Mutex<Option<Callback>>>,
    state_tx: watch::Sender<SchedulerState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Repeater {
    pub fn new(interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Paused);

        Self {
            interval: Mutex::new(interval.max(MIN_INTERVAL)),
            callback: Arc::new(Mutex::new(None)),
            state_tx,
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    fn ensure_task(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(());
        }

        let handle = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        *task = Some(handle.spawn(run_repeater(
            self.interval(),
            Arc::clone(&self.callback),
            self.state_tx.subscribe(),
        )));
        Ok(())
    }

    fn stop_task(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Scheduler for Repeater {
    fn configure(&self, interval: Duration) {
        *self.interval.lock() = interval.max(MIN_INTERVAL);

        // Respawn so the new interval applies from now
        self.stop_task();
        if self.state() == SchedulerState::Running {
            if let Err(e) = self.ensure_task() {
                tracing::warn!(error = %e, "Failed to restart repeater after reconfigure");
            }
        }
    }

    fn set_state(&self, state: SchedulerState) -> Result<()> {
        if state == SchedulerState::Running {
            self.ensure_task()?;
        }

        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Repeater state changed");
        }
        Ok(())
    }

    fn set_callback(&self, callback: Callback) {
        *self.callback.lock() = Some(callback);
    }

    fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }
}

impl Drop for Repeater {
    fn drop(&mut self) {
        self.stop_task();
    }
}

async fn run_repeater(
    interval: Duration,
    callback: Arc<Mutex<Option<Callback>>>,
    mut state_rx: watch::Receiver<SchedulerState>,
) {
    loop {
        while *state_rx.borrow_and_update() != SchedulerState::Running {
            if state_rx.changed().await.is_err() {
                return;
            }
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let current = callback.lock().clone();
                    if let Some(current) = current {
                        current();
                    }
                }
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if *state_rx.borrow_and_update() == SchedulerState::Paused {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(repeater: &Repeater) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        repeater.set_callback(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        count
    }

    #[test]
    fn test_running_requires_runtime() {
        let repeater = Repeater::new(Duration::from_secs(1));
        let err = repeater.set_state(SchedulerState::Running).unwrap_err();
        assert!(matches!(err, SessionError::NoRuntime));
        assert_eq!(repeater.state(), SchedulerState::Paused);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let repeater = Repeater::new(Duration::ZERO);
        assert_eq!(repeater.interval(), MIN_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_every_interval_while_running() {
        let repeater = Repeater::new(Duration::from_secs(15));
        let count = counting(&repeater);

        repeater.set_state(SchedulerState::Running).unwrap();
        tokio::time::sleep(Duration::from_millis(14_900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_repeater_does_not_fire() {
        let repeater = Repeater::new(Duration::from_secs(1));
        let count = counting(&repeater);

        repeater.set_state(SchedulerState::Running).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        repeater.set_state(SchedulerState::Paused).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        repeater.set_state(SchedulerState::Running).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_while_running_keeps_cadence() {
        let repeater = Repeater::new(Duration::from_secs(10));
        let count = counting(&repeater);

        repeater.set_state(SchedulerState::Running).unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        repeater.set_state(SchedulerState::Running).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        // Tick at t=10s was not pushed back by the second resume
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_ticks() {
        let repeater = Repeater::new(Duration::from_secs(1));
        let count = counting(&repeater);

        repeater.set_state(SchedulerState::Running).unwrap();
        drop(repeater);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
