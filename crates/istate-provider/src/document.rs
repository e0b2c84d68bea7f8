//! Fetching shared documents and run-state records by URL.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Plain GET of a JSON document.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch `url` and parse the body as JSON.
    ///
    /// Returns `Ok(None)` when the server answers with a non-success
    /// status. Transport and parse failures are errors.
    async fn fetch_json(&self, url: &str) -> ProviderResult<Option<Value>>;
}

/// [`DocumentFetcher`] over HTTP.
#[derive(Clone, Debug, Default)]
pub struct HttpDocumentFetcher {
    client: Client,
}

impl HttpDocumentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch_json(&self, url: &str) -> ProviderResult<Option<Value>> {
        let url = reqwest::Url::parse(url).map_err(|e| ProviderError::Fetch(e.to_string()))?;
        debug!(%url, "fetching document");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Fetch(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "document fetch unsuccessful");
            return Ok(None);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Fetch(format!("failed to parse response as JSON: {e}")))?;
        Ok(Some(body))
    }
}

/// In-memory [`DocumentFetcher`] keyed by URL.
///
/// Unknown URLs behave like a non-success status.
#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    documents: Mutex<HashMap<String, Value>>,
    failure: Mutex<Option<String>>,
    fetches: Mutex<Vec<String>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, body: Value) {
        self.documents
            .lock()
            .expect("lock poisoned")
            .insert(url.into(), body);
    }

    /// Make every fetch fail with a transport error carrying `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().expect("lock poisoned") = Some(message.to_string());
    }

    /// URLs requested so far, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl DocumentFetcher for InMemoryDocuments {
    async fn fetch_json(&self, url: &str) -> ProviderResult<Option<Value>> {
        self.fetches
            .lock()
            .expect("lock poisoned")
            .push(url.to_string());
        if let Some(message) = self.failure.lock().expect("lock poisoned").clone() {
            return Err(ProviderError::Fetch(message));
        }
        Ok(self.documents.lock().expect("lock poisoned").get(url).cloned())
    }
}
