use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::InstanceId;
use crate::state::ModuleState;

/// The context a module instance was launched in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunMode {
    /// Being configured by an author; no learner state exists.
    Authoring,
    /// Normal learner run.
    Runtime,
    /// Static snapshot shown in a report.
    Report,
    /// Per-item report rendering; no state is loaded.
    ReportItem,
}

impl RunMode {
    /// Returns `true` if this mode can carry module state at all.
    pub fn carries_state(&self) -> bool {
        matches!(self, Self::Runtime | Self::Report)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authoring => "authoring",
            Self::Runtime => "runtime",
            Self::Report => "report",
            Self::ReportItem => "reportItem",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authoring" => Ok(Self::Authoring),
            "runtime" => Ok(Self::Runtime),
            "report" => Ok(Self::Report),
            "reportItem" => Ok(Self::ReportItem),
            other => Err(TypeError::UnknownRunMode(other.to_string())),
        }
    }
}

/// State produced by a related module instance.
///
/// `updated_at` is optional because older hosts do not report it. A missing
/// timestamp means "unknown recency", never "oldest possible".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedStateEntry {
    pub instance_id: InstanceId,
    #[serde(default)]
    pub state: ModuleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LinkedStateEntry {
    pub fn new(instance_id: impl Into<InstanceId>, state: ModuleState) -> Self {
        Self {
            instance_id: instance_id.into(),
            state,
            updated_at: None,
        }
    }

    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }
}

/// Run context obtained once per session from the host.
///
/// Immutable after the handshake completes; held for the lifetime of the
/// session and shared by every dependent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResult {
    pub mode: RunMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<ModuleState>,
    /// Linked states, most directly related first.
    #[serde(default)]
    pub linked_states: Vec<LinkedStateEntry>,
    /// When the current state was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Domain the host is served from, used to rewrite embedded URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_remote_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_info_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_state_url: Option<String>,
}

impl HandshakeResult {
    /// A bare handshake in the given mode with nothing else populated.
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            instance_id: None,
            current_state: None,
            linked_states: Vec::new(),
            updated_at: None,
            host_domain: None,
            run_remote_endpoint: None,
            class_info_url: None,
            interactive_state_url: None,
        }
    }

    /// The instance identity to use for own-state attachment lookups.
    ///
    /// Only runtime sessions own their state; other modes read anonymously.
    pub fn owner_id(&self) -> Option<&InstanceId> {
        match self.mode {
            RunMode::Runtime => self.instance_id.as_ref(),
            _ => None,
        }
    }

    /// The most directly linked state, if any.
    pub fn direct_link(&self) -> Option<&LinkedStateEntry> {
        self.linked_states.first()
    }
}
