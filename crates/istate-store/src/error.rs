use istate_types::TypeError;

/// Errors from state and attachment store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The attachment backend rejected a write. Carries the backend's text.
    #[error("{0}")]
    AttachmentWrite(String),

    /// The attachment backend reported an unsuccessful read.
    #[error("error reading attachment contents: \"{0}\"")]
    AttachmentRead(String),

    /// The attachment body does not match its declared content type.
    #[error("malformed attachment {name}: {reason}")]
    MalformedAttachment { name: String, reason: String },

    /// The host channel itself failed. Carries the transport's text.
    #[error("{0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
