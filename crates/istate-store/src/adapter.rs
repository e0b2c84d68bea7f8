use std::fmt;
use std::sync::Arc;

use istate_types::{serialized_size, InstanceId, ModuleState};
use tracing::{debug, info};

use crate::attachment::AttachmentStore;
use crate::config::StorageConfig;
use crate::error::StoreResult;
use crate::traits::{StateBackend, StateUpdate};

/// Where a save puts the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageStrategy {
    Inline,
    Attachment,
}

impl fmt::Display for StorageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Attachment => write!(f, "attachment"),
        }
    }
}

/// Per-call save options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Store inline even when the state would otherwise be redirected.
    pub disable_attachment: bool,
}

/// Persists and retrieves the current instance's state.
///
/// Each save chooses between inline storage and the attachment store, then
/// flushes the host's buffered state channel so callers never wait on the
/// host's periodic timer.
pub struct StateStoreAdapter {
    state: Arc<dyn StateBackend>,
    attachments: AttachmentStore,
    config: StorageConfig,
}

impl StateStoreAdapter {
    pub fn new(
        state: Arc<dyn StateBackend>,
        attachments: AttachmentStore,
        config: StorageConfig,
    ) -> Self {
        Self {
            state,
            attachments,
            config,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    /// The strategy a default save of `state` would use.
    pub fn strategy_for(&self, state: &ModuleState) -> StoreResult<StorageStrategy> {
        if self.config.force_attachment {
            return Ok(StorageStrategy::Attachment);
        }
        let size = serialized_size(state)?;
        if size >= self.config.attachment_threshold {
            Ok(StorageStrategy::Attachment)
        } else {
            Ok(StorageStrategy::Inline)
        }
    }

    pub async fn save(&self, state: &ModuleState) -> StoreResult<()> {
        self.save_with(state, SaveOptions::default()).await
    }

    /// Persist `state` as this instance's state.
    ///
    /// If the attachment write fails nothing is persisted and the backend's
    /// error is returned.
    pub async fn save_with(&self, state: &ModuleState, options: SaveOptions) -> StoreResult<()> {
        let strategy = if options.disable_attachment {
            StorageStrategy::Inline
        } else {
            self.strategy_for(state)?
        };
        debug!(%strategy, "saving module state");

        let stored = match strategy {
            StorageStrategy::Attachment => {
                let reference = self
                    .attachments
                    .write(&self.config.attachment_name, state)
                    .await?;
                info!(name = %reference.name, "module state redirected to attachment");
                reference.to_state()
            }
            StorageStrategy::Inline => state.clone(),
        };

        self.commit(StateUpdate::Replace(stored)).await
    }

    /// Discard the current state.
    pub async fn clear(&self) -> StoreResult<()> {
        self.commit(StateUpdate::Clear).await
    }

    /// Mark the current state as freshly written without changing it.
    pub async fn touch(&self) -> StoreResult<()> {
        self.commit(StateUpdate::Touch).await
    }

    /// The stored state exactly as held by the host, references unresolved.
    pub async fn load_raw(&self) -> StoreResult<Option<ModuleState>> {
        self.state.current_state().await
    }

    /// The current state with any attachment reference resolved.
    pub async fn load(&self, owner: Option<&InstanceId>) -> StoreResult<Option<ModuleState>> {
        match self.state.current_state().await? {
            Some(state) => Ok(Some(self.attachments.resolve(state, owner).await?)),
            None => Ok(None),
        }
    }

    /// Queue `update` and flush it.
    ///
    /// A failed flush is returned to the caller but leaves the update
    /// queued in the backend, so it is still visible and a later flush
    /// commits it.
    async fn commit(&self, update: StateUpdate) -> StoreResult<()> {
        self.state.update_state(update).await?;
        self.state.flush().await
    }
}

impl fmt::Debug for StateStoreAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStoreAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
