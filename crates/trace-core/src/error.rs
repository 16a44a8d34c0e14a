//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] trace_storage::StorageError),

    #[error("Session error: {0}")]
    Session(#[from] trace_session::SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trace is disabled in the configuration")]
    Disabled,
}
