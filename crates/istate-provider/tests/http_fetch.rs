use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use istate_provider::{
    ConflictChoice, DocumentFetcher, FixedResolver, HandshakeResult, HttpDocumentFetcher,
    InMemoryHost, InteractiveApiProvider, LaunchLogger, MemoryLaunchLog, OpenSavedParams,
    ProviderBackends, ProviderConfig, RunMode, StaticHostChannel,
};

#[tokio::test]
async fn test_fetch_json_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"page": 3})))
        .mount(&server)
        .await;

    let fetcher = HttpDocumentFetcher::new();
    let body = fetcher
        .fetch_json(&format!("{}/docs/1.json", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, Some(json!({"page": 3})));
}

#[tokio::test]
async fn test_non_success_status_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/missing.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpDocumentFetcher::new();
    let body = fetcher
        .fetch_json(&format!("{}/docs/missing.json", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, None);
}

#[tokio::test]
async fn test_unparseable_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/bad.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let fetcher = HttpDocumentFetcher::new();
    let result = fetcher
        .fetch_json(&format!("{}/docs/bad.json", server.uri()))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_open_shared_document_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shared/42.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image": "https://old.example.org/sensor-interactive/img.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut handshake = HandshakeResult::new(RunMode::Runtime);
    handshake.host_domain = Some("new.example.org".into());
    let host = Arc::new(InMemoryHost::new());
    let backends = ProviderBackends::shared_host(
        host.clone(),
        Arc::new(StaticHostChannel::new(handshake)),
        Arc::new(FixedResolver::new(ConflictChoice::CandidateA)),
        Arc::new(HttpDocumentFetcher::new()),
    );
    let provider = InteractiveApiProvider::new(ProviderConfig::default(), backends);

    let document_id = format!("{}/shared/42.json", server.uri());
    let opened = provider
        .open_saved(OpenSavedParams {
            document_id: Some(document_id.clone()),
            interactive_state: None,
        })
        .await
        .unwrap();

    let expected = json!({"image": "https://new.example.org/sensor-interactive/img.png"});
    assert_eq!(opened.content.content(), &expected);
    assert_eq!(host.committed_state(), Some(expected));
    assert_eq!(
        opened.metadata.provider_data.unwrap().document_id,
        Some(document_id)
    );
}

#[tokio::test]
async fn test_launch_log_reads_run_state_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/run-state/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run_remote_endpoint": "https://runs.example.org/5"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut handshake = HandshakeResult::new(RunMode::Runtime);
    handshake.class_info_url = Some(format!("{}/classes/1", server.uri()));
    handshake.interactive_state_url = Some(format!("{}/run-state/5", server.uri()));

    let log = Arc::new(MemoryLaunchLog::new());
    let logger: Arc<dyn LaunchLogger> = log.clone();
    let backends = ProviderBackends::shared_host(
        Arc::new(InMemoryHost::new()),
        Arc::new(StaticHostChannel::new(handshake)),
        Arc::new(FixedResolver::new(ConflictChoice::CandidateA)),
        Arc::new(HttpDocumentFetcher::new()),
    );
    let provider =
        InteractiveApiProvider::new(ProviderConfig::default(), backends).with_launch_logger(logger);

    provider.initialize().await.unwrap();
    provider.initialize().await.unwrap();

    let records = log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].run_remote_endpoint, "https://runs.example.org/5");
}
