use std::sync::Arc;

use istate_types::{ContentType, InstanceId, ModuleState, StateReference};
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{AttachmentBackend, AttachmentRead, AttachmentWrite};

/// Typed access to the attachment backend.
///
/// Writes encode state according to its content type and hand back the
/// [`StateReference`] that replaces it inline. Reads decode the body back
/// into a [`ModuleState`].
#[derive(Clone)]
pub struct AttachmentStore {
    backend: Arc<dyn AttachmentBackend>,
}

impl AttachmentStore {
    pub fn new(backend: Arc<dyn AttachmentBackend>) -> Self {
        Self { backend }
    }

    /// Store `content` under `name`, picking the content type from its shape.
    pub async fn write(&self, name: &str, content: &ModuleState) -> StoreResult<StateReference> {
        self.write_as(name, content, ContentType::detect(content))
            .await
    }

    /// Store `content` under `name` with an explicit content type.
    pub async fn write_as(
        &self,
        name: &str,
        content: &ModuleState,
        content_type: ContentType,
    ) -> StoreResult<StateReference> {
        let body = encode(content, content_type)?;
        debug!(name, %content_type, bytes = body.len(), "writing attachment");
        let response = self
            .backend
            .write_attachment(AttachmentWrite {
                name: name.to_string(),
                content: body,
                content_type,
            })
            .await?;
        if !response.ok {
            return Err(StoreError::AttachmentWrite(response.status().to_string()));
        }
        Ok(StateReference::new(name, content_type))
    }

    /// Read the attachment named by `reference`.
    ///
    /// `owner` selects another instance's attachment; `None` reads the
    /// current instance's.
    pub async fn read(
        &self,
        reference: &StateReference,
        owner: Option<&InstanceId>,
    ) -> StoreResult<ModuleState> {
        debug!(name = %reference.name, owner = ?owner, "reading attachment");
        let response = self
            .backend
            .read_attachment(AttachmentRead {
                name: reference.name.clone(),
                owner_id: owner.cloned(),
            })
            .await?;
        if !response.ok {
            return Err(StoreError::AttachmentRead(response.status().to_string()));
        }
        let body = response.body.unwrap_or_default();
        decode(&reference.name, body, reference.effective_content_type())
    }

    /// Replace `state` with its attachment contents if it is a reference,
    /// otherwise return it as is.
    pub async fn resolve(
        &self,
        state: ModuleState,
        owner: Option<&InstanceId>,
    ) -> StoreResult<ModuleState> {
        match StateReference::from_state(&state) {
            Some(reference) => self.read(&reference, owner).await,
            None => Ok(state),
        }
    }
}

impl std::fmt::Debug for AttachmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentStore").finish_non_exhaustive()
    }
}

fn encode(content: &ModuleState, content_type: ContentType) -> StoreResult<String> {
    match (content_type, content) {
        (ContentType::Text, Value::String(text)) => Ok(text.clone()),
        _ => serde_json::to_string(content).map_err(|e| StoreError::Serialization(e.to_string())),
    }
}

fn decode(name: &str, body: String, content_type: ContentType) -> StoreResult<ModuleState> {
    match content_type {
        ContentType::Text => Ok(Value::String(body)),
        ContentType::Json => {
            serde_json::from_str(&body).map_err(|e| StoreError::MalformedAttachment {
                name: name.to_string(),
                reason: e.to_string(),
            })
        }
    }
}
