//! Diagnostic logger

use serde::{Deserialize, Serialize};

/// Area of the SDK a diagnostic message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Application,
    Launch,
    Session,
    Hardware,
    Network,
    Crash,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Application => "application",
            Category::Launch => "launch",
            Category::Session => "session",
            Category::Hardware => "hardware",
            Category::Network => "network",
            Category::Crash => "crash",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fire-and-forget diagnostic text sink
pub trait Logger: Send + Sync {
    fn debug(&self, category: Category, message: &str);

    /// Degraded-operation notices. Defaults to [`Logger::debug`].
    fn warn(&self, category: Category, message: &str) {
        self.debug(category, message);
    }
}

/// Logger that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, category: Category, message: &str) {
        tracing::debug!(category = %category, "{}", message);
    }

    fn warn(&self, category: Category, message: &str) {
        tracing::warn!(category = %category, "{}", message);
    }
}
