//! Choosing the authoritative state among own and linked states.
//!
//! Runs only in runtime mode and only when at least one linked state
//! exists. Candidates are compared by `updated_at`; a missing timestamp is
//! never "newer" than anything, so the directly linked state remains the
//! baseline whenever recency cannot be proven.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use istate_store::StateStoreAdapter;
use istate_types::{
    is_absent, HandshakeResult, InstanceId, LinkedStateEntry, ModuleState,
    ReconciliationOutcome, RunMode,
};
use tracing::{debug, info, warn};

use crate::error::SessionResult;

/// One side of a conflict prompt.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub state: ModuleState,
    pub instance_id: Option<InstanceId>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Candidate {
    fn linked(entry: &LinkedStateEntry) -> Self {
        Self {
            state: entry.state.clone(),
            instance_id: Some(entry.instance_id.clone()),
            updated_at: entry.updated_at,
        }
    }

    fn into_outcome(self) -> ReconciliationOutcome {
        ReconciliationOutcome::new(Some(self.state), self.instance_id)
    }
}

/// Data handed to the conflict-selection UI.
///
/// `candidate_a` is always the most recent linked state.
#[derive(Clone, Debug, PartialEq)]
pub struct ConflictPrompt {
    pub candidate_a: Candidate,
    pub candidate_b: Candidate,
    pub own_state_available: bool,
}

/// Which candidate the user picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictChoice {
    CandidateA,
    CandidateB,
}

/// Asks a human to pick between two candidate states.
///
/// Suspends until the user answers. The answer is always one of the two
/// offered candidates.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn choose(&self, prompt: &ConflictPrompt) -> ConflictChoice;
}

/// `true` only when both timestamps are known and `a` is strictly later.
fn is_newer(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

/// Index of the most recent linked state.
///
/// Ties keep the earliest entry. When the direct link reports no timestamp
/// it is taken as the most recent, since nothing can be proven newer.
fn most_recent_index(linked: &[LinkedStateEntry]) -> usize {
    let Some(direct) = linked.first() else {
        return 0;
    };
    if direct.updated_at.is_none() {
        return 0;
    }
    let mut best = 0;
    for (i, entry) in linked.iter().enumerate().skip(1) {
        if is_newer(entry.updated_at, linked[best].updated_at) {
            best = i;
        }
    }
    best
}

/// Decides which state a runtime session starts from.
pub struct Reconciler {
    store: Arc<StateStoreAdapter>,
    resolver: Arc<dyn ConflictResolver>,
}

impl Reconciler {
    pub fn new(store: Arc<StateStoreAdapter>, resolver: Arc<dyn ConflictResolver>) -> Self {
        Self { store, resolver }
    }

    pub fn store(&self) -> &Arc<StateStoreAdapter> {
        &self.store
    }

    /// Pick the authoritative state for `handshake`.
    ///
    /// Side effects on this instance's stored state:
    /// - user keeps own state over a newer link: own state is touched;
    /// - user picks the newer link over own state: own state is cleared;
    /// - no own state and the direct link is adopted: it is saved as own.
    ///
    /// Failures of those writes are logged and do not fail reconciliation.
    pub async fn reconcile(&self, handshake: &HandshakeResult) -> SessionResult<ReconciliationOutcome> {
        let own = handshake.current_state.clone();
        let own_id = handshake.instance_id.clone();

        let direct = match handshake.direct_link() {
            Some(direct) if handshake.mode == RunMode::Runtime => direct,
            _ => return Ok(ReconciliationOutcome::new(own, own_id)),
        };

        let linked = &handshake.linked_states;
        let recent_index = most_recent_index(linked);
        let most_recent = &linked[recent_index];
        let own_available = !is_absent(own.as_ref());

        if let Some(own_state) = own.as_ref().filter(|_| own_available) {
            if is_newer(most_recent.updated_at, handshake.updated_at) {
                debug!(linked = %most_recent.instance_id, "linked state is newer than own state");
                let prompt = ConflictPrompt {
                    candidate_a: Candidate::linked(most_recent),
                    candidate_b: Candidate {
                        state: own_state.clone(),
                        instance_id: own_id.clone(),
                        updated_at: handshake.updated_at,
                    },
                    own_state_available: true,
                };
                return Ok(match self.resolver.choose(&prompt).await {
                    ConflictChoice::CandidateA => {
                        info!(linked = %most_recent.instance_id, "user chose linked state; clearing own state");
                        if let Err(e) = self.store.clear().await {
                            warn!(error = %e, "failed to clear own state");
                        }
                        prompt.candidate_a.into_outcome()
                    }
                    ConflictChoice::CandidateB => {
                        info!("user kept own state");
                        if let Err(e) = self.store.touch().await {
                            warn!(error = %e, "failed to touch own state");
                        }
                        prompt.candidate_b.into_outcome()
                    }
                });
            }
            return Ok(ReconciliationOutcome::new(own, own_id));
        }

        if recent_index != 0 && is_newer(most_recent.updated_at, direct.updated_at) {
            debug!(
                direct = %direct.instance_id,
                linked = %most_recent.instance_id,
                "another linked state is newer than the direct link"
            );
            let prompt = ConflictPrompt {
                candidate_a: Candidate::linked(most_recent),
                candidate_b: Candidate::linked(direct),
                own_state_available: false,
            };
            return Ok(match self.resolver.choose(&prompt).await {
                ConflictChoice::CandidateA => prompt.candidate_a.into_outcome(),
                ConflictChoice::CandidateB => prompt.candidate_b.into_outcome(),
            });
        }

        if !is_absent(Some(&direct.state)) {
            return Ok(self.adopt(direct).await);
        }

        Ok(ReconciliationOutcome::new(own, own_id))
    }

    /// Take the direct link's state as this instance's own.
    ///
    /// A reference is resolved against the linked instance first, so the
    /// persisted copy does not point at another instance's attachment.
    async fn adopt(&self, direct: &LinkedStateEntry) -> ReconciliationOutcome {
        info!(direct = %direct.instance_id, "adopting directly linked state");
        let state = match self
            .store
            .attachments()
            .resolve(direct.state.clone(), Some(&direct.instance_id))
            .await
        {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "failed to resolve linked state; not persisting");
                return ReconciliationOutcome::new(
                    Some(direct.state.clone()),
                    Some(direct.instance_id.clone()),
                );
            }
        };
        if let Err(e) = self.store.save(&state).await {
            warn!(error = %e, "failed to persist adopted state");
        }
        ReconciliationOutcome::new(Some(state), Some(direct.instance_id.clone()))
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
