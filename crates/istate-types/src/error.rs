use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    #[error("unknown run mode: {0}")]
    UnknownRunMode(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
