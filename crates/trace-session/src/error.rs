//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to arm scheduler: {0}")]
    SchedulerArm(String),

    #[error("No Tokio runtime available")]
    NoRuntime,

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] trace_storage::StorageError),
}
