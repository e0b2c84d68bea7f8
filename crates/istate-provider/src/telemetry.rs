//! Launch telemetry: which remote run endpoint this session belongs to.

use std::sync::{Arc, Mutex};

use istate_types::{HandshakeResult, RunMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::DocumentFetcher;

const RUN_REMOTE_ENDPOINT: &str = "run_remote_endpoint";

/// One launch log record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchLogData {
    pub operation: String,
    #[serde(rename = "runStateUrl", skip_serializing_if = "Option::is_none")]
    pub run_state_url: Option<String>,
    pub run_remote_endpoint: String,
}

impl LaunchLogData {
    pub fn open(run_state_url: Option<String>, run_remote_endpoint: String) -> Self {
        Self {
            operation: "open".to_string(),
            run_state_url,
            run_remote_endpoint,
        }
    }
}

/// Sink for launch log records.
pub trait LaunchLogger: Send + Sync {
    fn log(&self, data: LaunchLogData);
}

/// [`LaunchLogger`] that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryLaunchLog {
    records: Mutex<Vec<LaunchLogData>>,
}

impl MemoryLaunchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LaunchLogData> {
        self.records.lock().expect("lock poisoned").clone()
    }
}

impl LaunchLogger for MemoryLaunchLog {
    fn log(&self, data: LaunchLogData) {
        self.records.lock().expect("lock poisoned").push(data);
    }
}

/// Log the session's remote run endpoint, if one can be found.
///
/// Only runtime sessions with a logger installed are reported. The endpoint
/// comes from the handshake, or else from the run-state document when the
/// handshake names both a class and a run-state URL. Every failure is
/// swallowed.
pub(crate) async fn report_run_endpoint(
    handshake: &HandshakeResult,
    logger: Option<&Arc<dyn LaunchLogger>>,
    fetcher: &dyn DocumentFetcher,
) {
    let Some(logger) = logger else {
        return;
    };
    if handshake.mode != RunMode::Runtime {
        return;
    }

    let run_state_url = handshake.interactive_state_url.clone();
    if let Some(endpoint) = &handshake.run_remote_endpoint {
        logger.log(LaunchLogData::open(run_state_url, endpoint.clone()));
        return;
    }

    let (Some(_), Some(url)) = (&handshake.class_info_url, &run_state_url) else {
        debug!("no run endpoint available for launch log");
        return;
    };

    match fetcher.fetch_json(url).await {
        Ok(Some(run_state)) => {
            match run_state.get(RUN_REMOTE_ENDPOINT).and_then(|v| v.as_str()) {
                Some(endpoint) => {
                    logger.log(LaunchLogData::open(run_state_url.clone(), endpoint.to_string()))
                }
                None => debug!(%url, "run state has no remote endpoint"),
            }
        }
        Ok(None) => debug!(%url, "run state unavailable"),
        Err(e) => warn!(error = %e, %url, "run state lookup failed"),
    }
}
