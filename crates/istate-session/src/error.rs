use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The host handshake failed. Carries the transport's text.
    #[error("{0}")]
    Handshake(String),

    /// A host or HTTP request failed. Carries the transport's text.
    #[error("{0}")]
    Transport(String),

    #[error("store error: {0}")]
    Store(#[from] istate_store::StoreError),
}

pub type SessionResult<T> = Result<T, SessionError>;
