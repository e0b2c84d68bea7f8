use async_trait::async_trait;
use istate_types::{ContentType, InstanceId, ModuleState};

use crate::error::StoreResult;

/// A change to the inline state held by the host.
#[derive(Clone, Debug, PartialEq)]
pub enum StateUpdate {
    /// Replace the state with a new value.
    Replace(ModuleState),
    /// Discard the state so the next session starts fresh.
    Clear,
    /// Bump the state's timestamp without changing its content.
    Touch,
}

/// Response from an attachment backend call.
///
/// A backend that was reached but refused the request reports `ok: false`
/// with its own `status_text`; transport failures surface as `Err` instead.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendResponse {
    pub ok: bool,
    pub status_text: Option<String>,
    pub body: Option<String>,
}

impl BackendResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn ok_with_body(body: impl Into<String>) -> Self {
        Self {
            ok: true,
            status_text: None,
            body: Some(body.into()),
        }
    }

    pub fn failed(status_text: impl Into<String>) -> Self {
        Self {
            ok: false,
            status_text: Some(status_text.into()),
            body: None,
        }
    }

    /// The status text, or an empty string when the backend gave none.
    pub fn status(&self) -> &str {
        self.status_text.as_deref().unwrap_or_default()
    }
}

/// Request to store an attachment for the current instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentWrite {
    pub name: String,
    pub content: String,
    pub content_type: ContentType,
}

/// Request to read an attachment, optionally owned by another instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentRead {
    pub name: String,
    pub owner_id: Option<InstanceId>,
}

/// The host's inline state channel for the current module instance.
///
/// Writes are buffered by the host and committed on [`flush`](Self::flush)
/// or on the host's own timer. [`current_state`](Self::current_state)
/// reflects buffered writes.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// The instance's current state, `None` if nothing has been stored.
    async fn current_state(&self) -> StoreResult<Option<ModuleState>>;

    /// Queue an update to the instance's state.
    async fn update_state(&self, update: StateUpdate) -> StoreResult<()>;

    /// Commit queued updates immediately.
    ///
    /// On failure the queued updates stay pending: they remain visible
    /// through `current_state` and are committed by the next flush.
    async fn flush(&self) -> StoreResult<()>;
}

/// Named auxiliary storage keyed to a module instance.
#[async_trait]
pub trait AttachmentBackend: Send + Sync {
    async fn write_attachment(&self, request: AttachmentWrite) -> StoreResult<BackendResponse>;

    async fn read_attachment(&self, request: AttachmentRead) -> StoreResult<BackendResponse>;
}
