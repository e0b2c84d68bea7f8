use std::sync::Arc;

use istate_session::{ConflictResolver, HostChannel, Session};
use istate_store::{AttachmentBackend, AttachmentStore, StateBackend, StateStoreAdapter, StoreError};
use istate_types::{is_empty_object, Capabilities, HandshakeResult, ModuleState};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::content::{CloudContent, CloudMetadata, OpenSavedParams, Opened, SaveReceipt};
use crate::document::DocumentFetcher;
use crate::error::{ProviderError, ProviderResult};
use crate::telemetry::{report_run_endpoint, LaunchLogger};

/// Everything a provider talks to outside the process.
pub struct ProviderBackends {
    pub channel: Arc<dyn HostChannel>,
    pub state: Arc<dyn StateBackend>,
    pub attachments: Arc<dyn AttachmentBackend>,
    pub resolver: Arc<dyn ConflictResolver>,
    pub documents: Arc<dyn DocumentFetcher>,
}

impl ProviderBackends {
    /// Backends where one host object serves both state and attachments.
    pub fn shared_host<H>(
        host: Arc<H>,
        channel: Arc<dyn HostChannel>,
        resolver: Arc<dyn ConflictResolver>,
        documents: Arc<dyn DocumentFetcher>,
    ) -> Self
    where
        H: StateBackend + AttachmentBackend + 'static,
    {
        Self {
            channel,
            state: host.clone(),
            attachments: host,
            resolver,
            documents,
        }
    }
}

/// Storage provider backed by the host's interactive-state channel.
///
/// One provider serves one module session. The host calls
/// [`initialize`](Self::initialize) once, hands the result to
/// [`open_saved`](Self::open_saved), and from then on calls
/// [`save`](Self::save) and [`load`](Self::load) as the module works.
pub struct InteractiveApiProvider {
    config: ProviderConfig,
    session: Session,
    documents: Arc<dyn DocumentFetcher>,
    launch_logger: Option<Arc<dyn LaunchLogger>>,
    initialized: OnceCell<OpenSavedParams>,
}

impl InteractiveApiProvider {
    pub const NAME: &'static str = "interactiveApi";

    pub fn new(config: ProviderConfig, backends: ProviderBackends) -> Self {
        let store = Arc::new(StateStoreAdapter::new(
            backends.state,
            AttachmentStore::new(backends.attachments),
            config.storage.clone(),
        ));
        Self {
            session: Session::new(backends.channel, store, backends.resolver),
            documents: backends.documents,
            launch_logger: None,
            initialized: OnceCell::new(),
            config,
        }
    }

    pub fn with_launch_logger(mut self, logger: Arc<dyn LaunchLogger>) -> Self {
        self.launch_logger = Some(logger);
        self
    }

    pub fn capabilities() -> Capabilities {
        Capabilities::interactive_state()
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The completed handshake, if any.
    pub fn handshake(&self) -> Option<Arc<HandshakeResult>> {
        self.session.handshake().get()
    }

    /// Returns `true` once [`initialize`](Self::initialize) has succeeded.
    pub fn is_ready(&self) -> bool {
        self.initialized.initialized()
    }

    /// Start the session and work out what the module should open with.
    ///
    /// After the handshake, the launch telemetry lookup and the initial
    /// state selection run concurrently; initialization completes when both
    /// do. Neither can fail it: a failed state selection yields no
    /// interactive state. Only a handshake failure is an error.
    ///
    /// The result is memoized.
    pub async fn initialize(&self) -> ProviderResult<OpenSavedParams> {
        self.initialized
            .get_or_try_init(|| async {
                let handshake = self.session.begin().await?;
                let (_, interactive_state) = tokio::join!(
                    report_run_endpoint(
                        &handshake,
                        self.launch_logger.as_ref(),
                        self.documents.as_ref()
                    ),
                    self.select_initial_state(),
                );
                info!(
                    mode = %handshake.mode,
                    has_state = interactive_state.is_some(),
                    "provider initialized"
                );
                Ok::<_, ProviderError>(OpenSavedParams {
                    document_id: self.config.document_id.clone(),
                    interactive_state,
                })
            })
            .await
            .cloned()
    }

    async fn select_initial_state(&self) -> Option<ModuleState> {
        let outcome = match self.session.initial_state().await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "initial state selection failed");
                return None;
            }
        };
        let state = outcome.state?;
        match self
            .session
            .store()
            .attachments()
            .resolve(state, outcome.instance_id.as_ref())
            .await
        {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "failed to resolve initial state");
                None
            }
        }
    }

    /// Read this instance's own state.
    ///
    /// A missing state, or an attachment whose contents cannot be parsed,
    /// yields `null` content. Backend read failures are errors.
    pub async fn load(&self, metadata: CloudMetadata) -> ProviderResult<Opened> {
        let handshake = self.session.begin().await?;
        let state = match self.session.store().load(handshake.owner_id()).await {
            Ok(state) => state.unwrap_or(Value::Null),
            Err(e @ StoreError::MalformedAttachment { .. }) => {
                warn!(error = %e, "stored state unreadable; loading empty");
                Value::Null
            }
            Err(e) => return Err(e.into()),
        };
        let content = istate_rewrite::rewrite(&state, handshake.host_domain.as_deref());
        Ok(Opened {
            content: CloudContent::new(content),
            metadata,
        })
    }

    /// Persist `content` as this instance's state.
    pub async fn save(
        &self,
        content: &CloudContent,
        metadata: &CloudMetadata,
    ) -> ProviderResult<SaveReceipt> {
        debug!(name = ?metadata.name, "saving module state");
        self.session.store().save(content.content()).await?;
        Ok(SaveReceipt {
            status: 200,
            state: content.content().clone(),
        })
    }

    pub fn can_open_saved(&self) -> bool {
        true
    }

    /// Parameters previously attached to `metadata` for [`open_saved`](Self::open_saved).
    pub fn open_saved_params(&self, metadata: &CloudMetadata) -> Option<OpenSavedParams> {
        metadata.provider_data.clone()
    }

    /// Open the module with the state chosen at initialization.
    ///
    /// Falls back to the shared document, which then becomes this
    /// instance's own state, and finally to an empty state.
    pub async fn open_saved(&self, params: OpenSavedParams) -> ProviderResult<Opened> {
        let domain = self.host_domain().await;
        let metadata = CloudMetadata::file(Self::NAME).provider_data(params.without_state());

        if let Some(state) = params
            .interactive_state
            .as_ref()
            .filter(|s| !s.is_null() && !is_empty_object(s))
        {
            debug!("opening with interactive state");
            return Ok(Opened {
                content: CloudContent::new(istate_rewrite::rewrite(state, domain.as_deref())),
                metadata,
            });
        }

        if let Some(document_id) = &params.document_id {
            info!(document = %document_id, "opening shared document");
            let body = match self.documents.fetch_json(document_id).await {
                Ok(Some(body)) if is_truthy(&body) => body,
                Ok(_) => return Err(ProviderError::OpenFailed(document_id.clone())),
                Err(e) => {
                    warn!(error = %e, document = %document_id, "shared document fetch failed");
                    return Err(ProviderError::OpenFailed(document_id.clone()));
                }
            };
            let state = istate_rewrite::rewrite(&body, domain.as_deref());
            self.session.store().save(&state).await?;
            return Ok(Opened {
                content: CloudContent::new(state),
                metadata,
            });
        }

        debug!("nothing to open; starting empty");
        let empty = Value::String(String::new());
        self.session.store().save(&empty).await?;
        Ok(Opened {
            content: CloudContent::new(empty),
            metadata,
        })
    }

    async fn host_domain(&self) -> Option<String> {
        match self.session.begin().await {
            Ok(handshake) => handshake.host_domain.clone(),
            Err(_) => None,
        }
    }
}

impl std::fmt::Debug for InteractiveApiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveApiProvider")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
