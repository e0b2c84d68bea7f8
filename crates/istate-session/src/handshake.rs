use std::sync::Arc;

use async_trait::async_trait;
use istate_types::HandshakeResult;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};

/// Request/response channel to the host environment.
#[async_trait]
pub trait HostChannel: Send + Sync {
    /// Ask the host for the module's run context.
    async fn init_interactive(&self) -> SessionResult<HandshakeResult>;
}

/// One-time handshake with the host.
///
/// The first call to [`begin`](Self::begin) issues the request; every later
/// or concurrent call awaits and shares the same result, including a
/// failure. The host is asked at most once per session.
pub struct Handshake {
    channel: Arc<dyn HostChannel>,
    result: OnceCell<Result<Arc<HandshakeResult>, String>>,
}

impl Handshake {
    pub fn new(channel: Arc<dyn HostChannel>) -> Self {
        Self {
            channel,
            result: OnceCell::new(),
        }
    }

    pub async fn begin(&self) -> SessionResult<Arc<HandshakeResult>> {
        let result = self
            .result
            .get_or_init(|| async {
                debug!("requesting run context from host");
                match self.channel.init_interactive().await {
                    Ok(handshake) => {
                        info!(
                            mode = %handshake.mode,
                            instance = ?handshake.instance_id,
                            linked = handshake.linked_states.len(),
                            "handshake complete"
                        );
                        Ok(Arc::new(handshake))
                    }
                    Err(e) => {
                        warn!(error = %e, "handshake failed");
                        Err(e.to_string())
                    }
                }
            })
            .await;
        result.clone().map_err(SessionError::Handshake)
    }

    /// The completed handshake, if it has finished successfully.
    pub fn get(&self) -> Option<Arc<HandshakeResult>> {
        self.result.get().and_then(|r| r.as_ref().ok().cloned())
    }

    pub fn is_complete(&self) -> bool {
        self.result.initialized()
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("complete", &self.is_complete())
            .finish()
    }
}
