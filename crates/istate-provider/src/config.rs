use std::path::Path;

use istate_store::StorageConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

/// `interactiveApi` launch value that forces every save into an attachment.
pub const ATTACHMENT_LAUNCH_VALUE: &str = "attachment";

/// Provider configuration.
///
/// Usually loaded from TOML and then overlaid with the launch URL's query
/// parameters:
///
/// ```toml
/// document_id = "https://docs.example.org/shared/123.json"
///
/// [storage]
/// attachment_threshold = 491520
/// attachment_name = "file.json"
/// force_attachment = false
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub storage: StorageConfig,
    /// Shared document to initialize from when no state is available.
    pub document_id: Option<String>,
}

impl ProviderConfig {
    pub fn from_toml_str(source: &str) -> ProviderResult<Self> {
        toml::from_str(source).map_err(|e| ProviderError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// This configuration with `launch` applied on top.
    pub fn with_launch(mut self, launch: &LaunchParams) -> Self {
        launch.apply(&mut self);
        self
    }
}

/// Parameters read from the module's launch URL query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchParams {
    /// Value of `interactiveApi`; `Some("")` when present without a value.
    pub interactive_api: Option<String>,
    /// Value of `documentId`.
    pub document_id: Option<String>,
}

impl LaunchParams {
    /// Parse a query string, with or without its leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "interactiveApi" => params.interactive_api = Some(value.into_owned()),
                "documentId" => params.document_id = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// Returns `true` if the launch asks this provider to handle state.
    pub fn selects_provider(&self) -> bool {
        self.interactive_api.is_some()
    }

    /// Returns `true` if every save must go through an attachment.
    pub fn forces_attachment(&self) -> bool {
        self.interactive_api.as_deref() == Some(ATTACHMENT_LAUNCH_VALUE)
    }

    pub fn apply(&self, config: &mut ProviderConfig) {
        if self.forces_attachment() {
            config.storage.force_attachment = true;
        }
        if let Some(document_id) = &self.document_id {
            config.document_id = Some(document_id.clone());
        }
    }
}
