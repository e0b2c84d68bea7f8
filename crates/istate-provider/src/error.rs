use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Session(#[from] istate_session::SessionError),

    #[error(transparent)]
    Store(#[from] istate_store::StoreError),

    #[error("unable to open saved document: {0}")]
    OpenFailed(String),

    /// An HTTP request failed. Carries the transport's text.
    #[error("{0}")]
    Fetch(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
