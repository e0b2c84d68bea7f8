use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use istate_types::{ContentType, InstanceId, ModuleState};
use serde_json::Value;

use crate::error::StoreResult;
use crate::traits::{
    AttachmentBackend, AttachmentRead, AttachmentWrite, BackendResponse, StateBackend, StateUpdate,
};

type AttachmentKey = (Option<InstanceId>, String);

#[derive(Default)]
struct HostState {
    committed: Option<ModuleState>,
    updated_at: Option<DateTime<Utc>>,
    pending: Vec<StateUpdate>,
    flushes: usize,
    attachments: HashMap<AttachmentKey, (String, ContentType)>,
    write_failure: Option<String>,
    read_failure: Option<String>,
}

impl HostState {
    fn apply(state: Option<ModuleState>, update: &StateUpdate) -> Option<ModuleState> {
        match update {
            StateUpdate::Replace(Value::Null) | StateUpdate::Clear => None,
            StateUpdate::Replace(value) => Some(value.clone()),
            StateUpdate::Touch => state,
        }
    }

    fn visible(&self) -> Option<ModuleState> {
        self.pending
            .iter()
            .fold(self.committed.clone(), |state, update| Self::apply(state, update))
    }
}

/// In-memory host implementing both the state channel and attachment storage.
///
/// Intended for tests and embedding. State updates are buffered until
/// [`flush`](StateBackend::flush), mirroring a host that batches writes on a
/// timer. Attachments are keyed by owning instance and name; writes land
/// under the host's own instance.
pub struct InMemoryHost {
    owner: Option<InstanceId>,
    inner: RwLock<HostState>,
}

impl InMemoryHost {
    /// Create an empty host with an anonymous owner.
    pub fn new() -> Self {
        Self {
            owner: None,
            inner: RwLock::new(HostState::default()),
        }
    }

    /// Create an empty host whose attachments belong to `owner`.
    pub fn with_owner(owner: impl Into<InstanceId>) -> Self {
        Self {
            owner: Some(owner.into()),
            inner: RwLock::new(HostState::default()),
        }
    }

    /// Seed the committed state, as if a previous session had saved it.
    pub fn seed_state(&self, state: ModuleState, updated_at: Option<DateTime<Utc>>) {
        let mut inner = self.inner.write().expect("lock poisoned");
        inner.committed = HostState::apply(None, &StateUpdate::Replace(state));
        inner.updated_at = updated_at;
    }

    /// Seed an attachment for `owner` (`None` for the anonymous owner).
    pub fn seed_attachment(
        &self,
        owner: Option<InstanceId>,
        name: &str,
        body: &str,
        content_type: ContentType,
    ) {
        self.inner
            .write()
            .expect("lock poisoned")
            .attachments
            .insert((owner, name.to_string()), (body.to_string(), content_type));
    }

    /// Make every subsequent attachment write report failure.
    pub fn fail_attachment_writes(&self, status_text: &str) {
        self.inner.write().expect("lock poisoned").write_failure = Some(status_text.to_string());
    }

    /// Make every subsequent attachment read report failure.
    pub fn fail_attachment_reads(&self, status_text: &str) {
        self.inner.write().expect("lock poisoned").read_failure = Some(status_text.to_string());
    }

    /// The committed (flushed) state.
    pub fn committed_state(&self) -> Option<ModuleState> {
        self.inner.read().expect("lock poisoned").committed.clone()
    }

    /// When the committed state was last written or touched.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().expect("lock poisoned").updated_at
    }

    /// Number of flushes that committed at least one update.
    pub fn flush_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").flushes
    }

    /// Returns `true` if updates are waiting for a flush.
    pub fn has_pending(&self) -> bool {
        !self.inner.read().expect("lock poisoned").pending.is_empty()
    }

    /// Number of stored attachments across all owners.
    pub fn attachment_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").attachments.len()
    }

    /// Raw body of an attachment.
    pub fn attachment(&self, owner: Option<InstanceId>, name: &str) -> Option<String> {
        self.inner
            .read()
            .expect("lock poisoned")
            .attachments
            .get(&(owner, name.to_string()))
            .map(|(body, _)| body.clone())
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateBackend for InMemoryHost {
    async fn current_state(&self) -> StoreResult<Option<ModuleState>> {
        Ok(self.inner.read().expect("lock poisoned").visible())
    }

    async fn update_state(&self, update: StateUpdate) -> StoreResult<()> {
        self.inner.write().expect("lock poisoned").pending.push(update);
        Ok(())
    }

    async fn flush(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner.pending.is_empty() {
            return Ok(());
        }
        inner.committed = inner.visible();
        inner.pending.clear();
        inner.updated_at = Some(Utc::now());
        inner.flushes += 1;
        Ok(())
    }
}

#[async_trait]
impl AttachmentBackend for InMemoryHost {
    async fn write_attachment(&self, request: AttachmentWrite) -> StoreResult<BackendResponse> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if let Some(status) = &inner.write_failure {
            return Ok(BackendResponse::failed(status.clone()));
        }
        inner.attachments.insert(
            (self.owner.clone(), request.name),
            (request.content, request.content_type),
        );
        Ok(BackendResponse::ok())
    }

    async fn read_attachment(&self, request: AttachmentRead) -> StoreResult<BackendResponse> {
        let inner = self.inner.read().expect("lock poisoned");
        if let Some(status) = &inner.read_failure {
            return Ok(BackendResponse::failed(status.clone()));
        }
        let owner = request.owner_id.or_else(|| self.owner.clone());
        match inner.attachments.get(&(owner, request.name)) {
            Some((body, _)) => Ok(BackendResponse::ok_with_body(body.clone())),
            None => Ok(BackendResponse::failed("Not Found")),
        }
    }
}

impl std::fmt::Debug for InMemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("lock poisoned");
        f.debug_struct("InMemoryHost")
            .field("owner", &self.owner)
            .field("pending", &inner.pending.len())
            .field("attachments", &inner.attachments.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn updates_are_buffered_until_flush() {
        let host = InMemoryHost::new();
        host.update_state(StateUpdate::Replace(json!({"a": 1}))).await.unwrap();

        assert!(host.has_pending());
        assert_eq!(host.committed_state(), None);
        assert_eq!(host.current_state().await.unwrap(), Some(json!({"a": 1})));

        host.flush().await.unwrap();
        assert!(!host.has_pending());
        assert_eq!(host.committed_state(), Some(json!({"a": 1})));
        assert_eq!(host.flush_count(), 1);
    }

    #[tokio::test]
    async fn empty_flush_is_a_no_op() {
        let host = InMemoryHost::new();
        host.flush().await.unwrap();
        assert_eq!(host.flush_count(), 0);
        assert!(host.updated_at().is_none());
    }

    #[tokio::test]
    async fn clear_and_null_replace_both_remove_state() {
        let host = InMemoryHost::new();
        host.seed_state(json!("seed"), None);
        host.update_state(StateUpdate::Clear).await.unwrap();
        assert_eq!(host.current_state().await.unwrap(), None);

        host.seed_state(json!("seed"), None);
        host.update_state(StateUpdate::Replace(Value::Null)).await.unwrap();
        host.flush().await.unwrap();
        assert_eq!(host.committed_state(), None);
    }

    #[tokio::test]
    async fn touch_bumps_timestamp_only() {
        let host = InMemoryHost::new();
        let old = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        host.seed_state(json!({"kept": true}), Some(old));

        host.update_state(StateUpdate::Touch).await.unwrap();
        host.flush().await.unwrap();
        assert_eq!(host.committed_state(), Some(json!({"kept": true})));
        assert!(host.updated_at().unwrap() > old);
    }

    #[tokio::test]
    async fn attachments_are_keyed_by_owner() {
        let host = InMemoryHost::with_owner("10");
        host.write_attachment(AttachmentWrite {
            name: "file.json".into(),
            content: "{}".into(),
            content_type: ContentType::Json,
        })
        .await
        .unwrap();

        assert_eq!(host.attachment(Some("10".into()), "file.json").as_deref(), Some("{}"));
        assert!(host.attachment(None, "file.json").is_none());

        let own = host
            .read_attachment(AttachmentRead { name: "file.json".into(), owner_id: None })
            .await
            .unwrap();
        assert!(own.ok);

        let other = host
            .read_attachment(AttachmentRead {
                name: "file.json".into(),
                owner_id: Some("11".into()),
            })
            .await
            .unwrap();
        assert!(!other.ok);
        assert_eq!(other.status(), "Not Found");
    }

    #[tokio::test]
    async fn injected_read_failure() {
        let host = InMemoryHost::new();
        host.seed_attachment(None, "file.json", "x", ContentType::Text);
        host.fail_attachment_reads("Service Unavailable");
        let response = host
            .read_attachment(AttachmentRead { name: "file.json".into(), owner_id: None })
            .await
            .unwrap();
        assert!(!response.ok);
        assert_eq!(response.status(), "Service Unavailable");
    }

    #[test]
    fn debug_format() {
        let debug = format!("{:?}", InMemoryHost::with_owner("3"));
        assert!(debug.contains("InMemoryHost"));
        assert!(debug.contains("attachments"));
    }
}
