use std::sync::Arc;

use istate_store::StateStoreAdapter;
use istate_types::{HandshakeResult, ReconciliationOutcome, RunMode};
use tracing::debug;

use crate::error::SessionResult;
use crate::handshake::{Handshake, HostChannel};
use crate::reconcile::{ConflictResolver, Reconciler};

/// Per-session state: the memoized handshake and the reconciler.
///
/// Constructed once per module session and shared by reference with every
/// dependent.
pub struct Session {
    handshake: Handshake,
    reconciler: Reconciler,
}

impl Session {
    pub fn new(
        channel: Arc<dyn HostChannel>,
        store: Arc<StateStoreAdapter>,
        resolver: Arc<dyn ConflictResolver>,
    ) -> Self {
        Self {
            handshake: Handshake::new(channel),
            reconciler: Reconciler::new(store, resolver),
        }
    }

    /// Run (or join) the session's handshake.
    pub async fn begin(&self) -> SessionResult<Arc<HandshakeResult>> {
        self.handshake.begin().await
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn store(&self) -> &Arc<StateStoreAdapter> {
        self.reconciler.store()
    }

    /// The state the module should open with, if any.
    ///
    /// - authoring / report item: no state;
    /// - report: the reported state as is, never reconciled;
    /// - runtime: whatever the reconciler decides.
    pub async fn initial_state(&self) -> SessionResult<Option<ReconciliationOutcome>> {
        let handshake = self.begin().await?;
        match handshake.mode {
            RunMode::Authoring | RunMode::ReportItem => {
                debug!(mode = %handshake.mode, "no initial state in this mode");
                Ok(None)
            }
            RunMode::Report => Ok(Some(ReconciliationOutcome::new(
                handshake.current_state.clone(),
                None,
            ))),
            RunMode::Runtime => self.reconciler.reconcile(&handshake).await.map(Some),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("handshake", &self.handshake)
            .field("reconciler", &self.reconciler)
            .finish()
    }
}
