//! Resource state
//!
//! The device/network descriptor associated with the current session. A new
//! resource always replaces the old one through [`commit`], which keeps the
//! merge rule pure and returns the side effects for the caller to run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trace_hardware::DeviceDescriptor;

use crate::identity::SessionId;
use crate::logger::Category;

/// Crash reporter user info key for the resource snapshot
pub const RESOURCE_KEY: &str = "Resource";

pub(crate) const CREATED_MESSAGE: &str = "Resource created for this new session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(flatten)]
    pub device: DeviceDescriptor,
    /// Session id that stamped this resource
    #[serde(default)]
    pub session: String,
}

impl Resource {
    /// Unstamped resource built from a device reading
    pub fn new(device: DeviceDescriptor) -> Self {
        Self {
            device,
            session: String::new(),
        }
    }

    /// Active network interface, treating an empty name as absent
    pub fn network(&self) -> Option<&str> {
        self.device.network.as_deref().filter(|n| !n.is_empty())
    }

    pub fn set_network(&mut self, network: impl Into<String>) {
        self.device.network = Some(network.into());
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Side effect produced by a resource commit
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Log {
        category: Category,
        message: &'static str,
    },
    /// Replace the side-channel entry under `key` with `resource`
    Publish {
        key: &'static str,
        resource: Resource,
    },
}

/// Result of replacing the current resource
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub resource: Resource,
    pub effects: Vec<Effect>,
}

/// Replace `old` with `new`, stamping it with `session`.
///
/// A non-empty network on `old` survives when `new` carries none. Every other
/// field is taken from `new` as is.
pub fn commit(old: Option<&Resource>, mut new: Resource, session: &SessionId) -> Commit {
    let mut effects = Vec::with_capacity(2);

    match old {
        Some(old) => {
            if new.network().is_none() {
                if let Some(network) = old.network() {
                    new.set_network(network);
                }
            }
        }
        None => effects.push(Effect::Log {
            category: Category::Application,
            message: CREATED_MESSAGE,
        }),
    }

    new.session = session.to_string();

    effects.push(Effect::Publish {
        key: RESOURCE_KEY,
        resource: new.clone(),
    });

    Commit {
        resource: new,
        effects,
    }
}
