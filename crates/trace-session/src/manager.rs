//! Session Manager
//!
//! Owns the session id, the current resource and the sampling scheduler.
//! Resource writes happen on the injected execution context, apart from the
//! session re-stamp done while rotating the id. The scheduler callback and
//! every dispatched job hold a `Weak` handle, so once the manager is dropped
//! they turn into no-ops.
//!
//! Locks are always taken session id first, then resource. Side-channel
//! publishes happen while the id lock is held.

use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use trace_hardware::HardwareSampler;

use crate::collaborators::{Collaborators, DeliveryQueue, DiagnosticChannel};
use crate::config::SessionConfig;
use crate::dispatch::ExecutionContext;
use crate::identity::{IdentityGenerator, SessionId};
use crate::logger::{Category, Logger};
use crate::resource::{commit, Commit, Effect, Resource, RESOURCE_KEY};
use crate::scheduler::{Scheduler, SchedulerState};
use crate::Result;

/// Operational counters. Failures are never surfaced as errors, only here and
/// in the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Scheduler ticks handled
    pub ticks: u64,
    /// Batches handed to the delivery queue
    pub batches_enqueued: u64,
    /// Probes that produced no reading, summed over all samples
    pub probe_failures: u64,
    /// Side-channel snapshots that could not be serialized or stored
    pub side_channel_failures: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    batches_enqueued: AtomicU64,
    probe_failures: AtomicU64,
    side_channel_failures: AtomicU64,
}

struct Shared {
    config: SessionConfig,
    identity: IdentityGenerator,
    session_id: RwLock<SessionId>,
    resource: RwLock<Option<Resource>>,
    scheduler: Box<dyn Scheduler>,
    sampler: Arc<dyn HardwareSampler>,
    queue: Arc<dyn DeliveryQueue>,
    diagnostics: Arc<dyn DiagnosticChannel>,
    logger: Arc<dyn Logger>,
    context: Arc<dyn ExecutionContext>,
    counters: Counters,
}

pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    /// Start a new session.
    ///
    /// Arms `scheduler` at `config.interval` and schedules the first resource
    /// refresh and sample after `config.initial_delay`. Fails only when the
    /// scheduler cannot be armed.
    pub fn start(
        config: SessionConfig,
        scheduler: Box<dyn Scheduler>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let identity = IdentityGenerator::new();
        let session_id = identity.next();

        let shared = Arc::new(Shared {
            config,
            identity,
            session_id: RwLock::new(session_id),
            resource: RwLock::new(None),
            scheduler,
            sampler: collaborators.sampler,
            queue: collaborators.queue,
            diagnostics: collaborators.diagnostics,
            logger: collaborators.logger,
            context: collaborators.context,
            counters: Counters::default(),
        });

        let weak = Arc::downgrade(&shared);
        shared.scheduler.configure(config.interval);
        shared.scheduler.set_callback(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_tick();
            }
        }));
        shared.scheduler.set_state(SchedulerState::Running)?;

        shared.context.dispatch_after(
            config.initial_delay,
            refresh_and_sample(Arc::downgrade(&shared)),
        );

        tracing::info!(
            session_id = %session_id,
            interval_ms = config.interval.as_millis() as u64,
            initial_delay_ms = config.initial_delay.as_millis() as u64,
            "Started session"
        );

        Ok(Self { shared })
    }

    /// Begin a new session: re-arm sampling, rotate the id and refresh the
    /// resource out of band.
    pub fn restart(&self) {
        let shared = &self.shared;

        if let Err(e) = shared.scheduler.set_state(SchedulerState::Running) {
            shared.logger.warn(
                Category::Session,
                &format!("Failed to resume sampling on restart: {e}"),
            );
        }

        // Rotate before dispatching so the refresh below stamps the new id
        let session_id = shared.rotate_identity();

        shared
            .context
            .dispatch(refresh_and_sample(Arc::downgrade(shared)));

        tracing::info!(session_id = %session_id, "Restarted session");
    }

    /// Stop periodic sampling. The session id is kept.
    pub fn pause(&self) {
        if let Err(e) = self.shared.scheduler.set_state(SchedulerState::Paused) {
            self.shared.logger.warn(
                Category::Session,
                &format!("Failed to pause sampling: {e}"),
            );
        }
    }

    /// Resume periodic sampling without rotating the session id
    pub fn resume(&self) {
        if let Err(e) = self.shared.scheduler.set_state(SchedulerState::Running) {
            self.shared.logger.warn(
                Category::Session,
                &format!("Failed to resume sampling: {e}"),
            );
        }
    }

    pub fn session_id(&self) -> SessionId {
        *self.shared.session_id.read()
    }

    /// Copy of the current resource, if one has been committed
    pub fn resource(&self) -> Option<Resource> {
        self.shared.resource.read().clone()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.shared.scheduler.state()
    }

    pub fn config(&self) -> SessionConfig {
        self.shared.config
    }

    pub fn stats(&self) -> SessionStats {
        let c = &self.shared.counters;
        SessionStats {
            ticks: c.ticks.load(Ordering::Relaxed),
            batches_enqueued: c.batches_enqueued.load(Ordering::Relaxed),
            probe_failures: c.probe_failures.load(Ordering::Relaxed),
            side_channel_failures: c.side_channel_failures.load(Ordering::Relaxed),
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        let _ = self.shared.scheduler.set_state(SchedulerState::Paused);
        tracing::debug!(session_id = %self.session_id(), "Session manager dropped");
    }
}

fn refresh_and_sample(weak: Weak<Shared>) -> crate::dispatch::Job {
    Box::new(move || {
        if let Some(shared) = weak.upgrade() {
            shared.refresh_resource();
            shared.sample_and_publish();
        }
    })
}

impl Shared {
    /// Swap in a new session id and re-stamp the live resource with it
    fn rotate_identity(&self) -> SessionId {
        let next = self.identity.next();

        let mut session_id = self.session_id.write();
        *session_id = next;

        let restamped = self.resource.write().as_mut().map(|resource| {
            resource.session = next.to_string();
            resource.clone()
        });

        // Keep the id locked until the side channel carries the new stamp
        let _session_id = RwLockWriteGuard::downgrade(session_id);
        if let Some(resource) = restamped {
            self.publish(RESOURCE_KEY, &resource);
        }

        next
    }

    fn on_tick(self: &Arc<Self>) {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
        self.sample_and_publish();
    }

    /// Replace the resource with a fresh device reading. Runs on the context.
    fn refresh_resource(&self) {
        let fresh = Resource::new(self.sampler.device_descriptor());

        // Held through the publish below, so a rotation cannot slip in between
        // stamping and mirroring the resource
        let session_id = self.session_id.read();

        let Commit { resource, effects } = {
            let mut slot = self.resource.write();
            let commit = commit(slot.as_ref(), fresh, &session_id);
            *slot = Some(commit.resource.clone());
            commit
        };

        tracing::debug!(
            session_id = %resource.session,
            network = ?resource.network(),
            "Resource refreshed"
        );

        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&self, effect: Effect) {
        match effect {
            Effect::Log { category, message } => self.logger.debug(category, message),
            Effect::Publish { key, resource } => self.publish(key, &resource),
        }
    }

    fn publish(&self, key: &str, resource: &Resource) {
        let outcome = resource
            .to_json()
            .map_err(crate::SessionError::from)
            .and_then(|value| self.diagnostics.set_snapshot(key, value));

        if let Err(e) = outcome {
            self.counters
                .side_channel_failures
                .fetch_add(1, Ordering::Relaxed);
            self.logger.warn(
                Category::Crash,
                &format!("Failed to update crash user info `{key}`: {e}"),
            );
        }
    }

    /// Sample hardware and hand the batch to the delivery queue
    fn sample_and_publish(self: &Arc<Self>) {
        let batch = self.sampler.metrics_batch();

        if !batch.failed_probes.is_empty() {
            self.counters
                .probe_failures
                .fetch_add(batch.failed_probes.len() as u64, Ordering::Relaxed);
            self.logger.debug(
                Category::Hardware,
                &format!("Probes without reading: {}", batch.failed_probes.join(", ")),
            );
        }

        if let Some(interface) = self
            .sampler
            .connectivity_interface()
            .filter(|name| !name.is_empty())
        {
            let weak = Arc::downgrade(self);
            self.context.dispatch(Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.patch_network(interface);
                }
            }));
        }

        self.queue.enqueue(batch);
        self.counters
            .batches_enqueued
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Point the live resource at `interface` without running the merge.
    /// Runs on the context.
    fn patch_network(&self, interface: String) {
        let _session_id = self.session_id.read();

        let patched = {
            let mut slot = self.resource.write();
            match slot.as_mut() {
                Some(resource) if resource.network() != Some(interface.as_str()) => {
                    resource.set_network(interface);
                    Some(resource.clone())
                }
                _ => None,
            }
        };

        if let Some(resource) = patched {
            self.logger.debug(
                Category::Network,
                &format!("Network interface changed to {}", resource.network().unwrap_or("")),
            );
            self.publish(RESOURCE_KEY, &resource);
        }
    }
}
