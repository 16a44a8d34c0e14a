//! Trace Session Management
//!
//! - A session is identified by a rotating, time-ordered ULID
//! - The session owns the latest device/network `Resource`, stamped with the
//!   session id that produced it
//! - Hardware is sampled on a fixed interval and published to the delivery
//!   queue; the resource is mirrored into the crash reporter's user info
//! - All resource mutations run on one serial execution context

mod collaborators;
mod config;
mod dispatch;
mod error;
mod identity;
mod logger;
mod manager;
mod resource;
mod scheduler;

#[cfg(test)]
mod testing;

pub use collaborators::{Collaborators, DeliveryQueue, DiagnosticChannel};
pub use config::SessionConfig;
pub use dispatch::{ExecutionContext, Job, SerialQueue};
pub use error::SessionError;
pub use identity::{IdentityGenerator, SessionId};
pub use logger::{Category, Logger, TracingLogger};
pub use manager::{SessionManager, SessionStats};
pub use resource::{commit, Commit, Effect, Resource, RESOURCE_KEY};
pub use scheduler::{Callback, Repeater, Scheduler, SchedulerState};

pub type Result<T> = std::result::Result<T, SessionError>;
