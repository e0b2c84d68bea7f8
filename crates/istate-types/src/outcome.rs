use serde::{Deserialize, Serialize};

use crate::identity::InstanceId;
use crate::state::ModuleState;

/// The state chosen for one load, with the instance that owns it.
///
/// Produced fresh on every reconciliation and never cached, since the
/// choice may depend on a user's answer to a conflict prompt.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationOutcome {
    pub state: Option<ModuleState>,
    pub instance_id: Option<InstanceId>,
}

impl ReconciliationOutcome {
    pub fn new(state: Option<ModuleState>, instance_id: Option<InstanceId>) -> Self {
        Self { state, instance_id }
    }

    /// An outcome with no state and no owner.
    pub fn empty() -> Self {
        Self::default()
    }
}
