//! Content envelope and metadata exchanged with the document host.

use istate_types::ModuleState;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Module state wrapped for the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudContent {
    content: ModuleState,
}

impl CloudContent {
    pub fn new(content: ModuleState) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &ModuleState {
        &self.content
    }

    pub fn into_content(self) -> ModuleState {
        self.content
    }

    /// The host's wire form: `{"content": <state>}`.
    pub fn to_envelope(&self) -> Value {
        json!({ "content": self.content })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataKind {
    #[default]
    File,
    Folder,
}

/// Host-side description of an opened document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudMetadata {
    #[serde(rename = "type")]
    pub kind: MetadataKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_data: Option<OpenSavedParams>,
}

impl CloudMetadata {
    pub fn file(provider: &str) -> Self {
        Self {
            kind: MetadataKind::File,
            provider: Some(provider.to_string()),
            ..Self::default()
        }
    }

    pub fn provider_data(mut self, params: OpenSavedParams) -> Self {
        self.provider_data = Some(params);
        self
    }
}

/// What the host passes back to `open_saved`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSavedParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_state: Option<ModuleState>,
}

impl OpenSavedParams {
    /// The same parameters with the interactive state dropped.
    pub fn without_state(&self) -> Self {
        Self {
            document_id: self.document_id.clone(),
            interactive_state: None,
        }
    }
}

/// Result of opening a document.
#[derive(Clone, Debug, PartialEq)]
pub struct Opened {
    pub content: CloudContent,
    pub metadata: CloudMetadata,
}

/// Result of a successful save.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveReceipt {
    pub status: u16,
    pub state: ModuleState,
}
