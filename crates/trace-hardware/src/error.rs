//! Probe error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("{0} probe is not supported on this platform")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {source_name}: {reason}")]
    Parse {
        source_name: &'static str,
        reason: String,
    },
}

impl ProbeError {
    pub(crate) fn parse(source_name: &'static str, reason: impl Into<String>) -> Self {
        ProbeError::Parse {
            source_name,
            reason: reason.into(),
        }
    }
}
