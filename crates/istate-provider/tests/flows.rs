//! End-to-end provider flows against in-memory host backends.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use istate_provider::{
    CloudContent, CloudMetadata, ConflictChoice, FixedResolver, HandshakeResult, InMemoryDocuments,
    InMemoryHost, InteractiveApiProvider, LaunchLogger, LaunchParams, MemoryLaunchLog,
    OpenSavedParams, ProviderBackends, ProviderConfig, ProviderError, RunMode, StaticHostChannel,
};
use istate_types::{LinkedStateEntry, StateReference};

struct Fixture {
    provider: InteractiveApiProvider,
    host: Arc<InMemoryHost>,
    channel: Arc<StaticHostChannel>,
    resolver: Arc<FixedResolver>,
    documents: Arc<InMemoryDocuments>,
}

fn at(month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap()
}

fn runtime(instance: &str) -> HandshakeResult {
    let mut handshake = HandshakeResult::new(RunMode::Runtime);
    handshake.instance_id = Some(instance.into());
    handshake
}

fn fixture(handshake: HandshakeResult, config: ProviderConfig, choice: ConflictChoice) -> Fixture {
    let host = Arc::new(match &handshake.instance_id {
        Some(id) => InMemoryHost::with_owner(id.clone()),
        None => InMemoryHost::new(),
    });
    if let Some(state) = &handshake.current_state {
        host.seed_state(state.clone(), handshake.updated_at);
    }
    let channel = Arc::new(StaticHostChannel::new(handshake));
    let resolver = Arc::new(FixedResolver::new(choice));
    let documents = Arc::new(InMemoryDocuments::new());
    let provider = InteractiveApiProvider::new(
        config,
        ProviderBackends::shared_host(
            host.clone(),
            channel.clone(),
            resolver.clone(),
            documents.clone(),
        ),
    );
    Fixture {
        provider,
        host,
        channel,
        resolver,
        documents,
    }
}

fn simple(handshake: HandshakeResult) -> Fixture {
    fixture(handshake, ProviderConfig::default(), ConflictChoice::CandidateA)
}

async fn load(fixture: &Fixture) -> Value {
    fixture
        .provider
        .load(CloudMetadata::default())
        .await
        .unwrap()
        .content
        .into_content()
}

#[tokio::test]
async fn test_newer_link_prompts_once_and_clears_own_state() {
    let mut handshake = runtime("own");
    handshake.current_state = Some(json!({"page": 1}));
    handshake.updated_at = Some(at(1));
    handshake.linked_states = vec![LinkedStateEntry::new("prev", json!({"page": 9})).updated_at(at(6))];
    let fx = simple(handshake);

    let params = fx.provider.initialize().await.unwrap();

    assert_eq!(params.interactive_state, Some(json!({"page": 9})));
    assert_eq!(fx.resolver.prompts(), 1);
    assert_eq!(load(&fx).await, Value::Null);
}

#[tokio::test]
async fn test_keeping_own_state_touches_it() {
    let mut handshake = runtime("own");
    handshake.current_state = Some(json!({"page": 1}));
    handshake.updated_at = Some(at(1));
    handshake.linked_states = vec![LinkedStateEntry::new("prev", json!({"page": 9})).updated_at(at(6))];
    let fx = fixture(handshake, ProviderConfig::default(), ConflictChoice::CandidateB);

    let params = fx.provider.initialize().await.unwrap();

    assert_eq!(params.interactive_state, Some(json!({"page": 1})));
    assert!(fx.host.updated_at().unwrap() > at(6));
    assert_eq!(load(&fx).await, json!({"page": 1}));
}

#[tokio::test]
async fn test_no_links_returns_own_state_without_prompt() {
    let mut handshake = runtime("own");
    handshake.current_state = Some(json!({"answer": "b"}));
    let fx = simple(handshake);

    let params = fx.provider.initialize().await.unwrap();

    assert_eq!(params.interactive_state, Some(json!({"answer": "b"})));
    assert_eq!(fx.resolver.prompts(), 0);
}

#[tokio::test]
async fn test_adopted_direct_link_becomes_own_state() {
    let mut handshake = runtime("own");
    handshake.linked_states = vec![LinkedStateEntry::new("prev", json!({"drawing": [1, 2]}))];
    let fx = simple(handshake);

    let params = fx.provider.initialize().await.unwrap();

    assert_eq!(params.interactive_state, Some(json!({"drawing": [1, 2]})));
    assert_eq!(fx.resolver.prompts(), 0);
    assert_eq!(load(&fx).await, json!({"drawing": [1, 2]}));
}

#[tokio::test]
async fn test_adopted_reference_is_resolved_from_linked_instance() {
    let mut handshake = runtime("own");
    let reference = StateReference::new("file.json", istate_types::ContentType::Json);
    handshake.linked_states = vec![LinkedStateEntry::new("prev", reference.to_state())];
    let fx = simple(handshake);
    fx.host.seed_attachment(
        Some("prev".into()),
        "file.json",
        r#"{"big": true}"#,
        istate_types::ContentType::Json,
    );

    let params = fx.provider.initialize().await.unwrap();

    assert_eq!(params.interactive_state, Some(json!({"big": true})));
    assert_eq!(fx.host.committed_state(), Some(json!({"big": true})));
}

#[tokio::test]
async fn test_report_mode_never_prompts() {
    let mut handshake = HandshakeResult::new(RunMode::Report);
    handshake.instance_id = Some("own".into());
    handshake.current_state = Some(json!({"reported": true}));
    handshake.updated_at = Some(at(1));
    handshake.linked_states = vec![LinkedStateEntry::new("prev", json!({"x": 1})).updated_at(at(9))];
    let fx = simple(handshake);

    let params = fx.provider.initialize().await.unwrap();

    assert_eq!(params.interactive_state, Some(json!({"reported": true})));
    assert_eq!(fx.resolver.prompts(), 0);
}

#[tokio::test]
async fn test_authoring_has_no_initial_state() {
    let mut handshake = HandshakeResult::new(RunMode::Authoring);
    handshake.current_state = Some(json!({"ignored": true}));
    let fx = simple(handshake);

    let params = fx.provider.initialize().await.unwrap();
    assert_eq!(params.interactive_state, None);
}

#[tokio::test]
async fn test_initialize_is_memoized() {
    let mut handshake = runtime("own");
    handshake.run_remote_endpoint = Some("https://runs.example.org/1".into());
    let mut fx = simple(handshake);
    let log = Arc::new(MemoryLaunchLog::new());
    let logger: Arc<dyn LaunchLogger> = log.clone();
    fx.provider = fx.provider.with_launch_logger(logger);

    let (a, b) = tokio::join!(fx.provider.initialize(), fx.provider.initialize());
    assert_eq!(a.unwrap(), b.unwrap());
    fx.provider.initialize().await.unwrap();
    fx.provider.load(CloudMetadata::default()).await.unwrap();

    assert_eq!(fx.channel.requests(), 1);
    assert_eq!(log.records().len(), 1);
}

#[tokio::test]
async fn test_handshake_failure_is_verbatim() {
    let host = Arc::new(InMemoryHost::new());
    let channel = Arc::new(StaticHostChannel::failing("host did not respond"));
    let provider = InteractiveApiProvider::new(
        ProviderConfig::default(),
        ProviderBackends::shared_host(
            host,
            channel.clone(),
            Arc::new(FixedResolver::new(ConflictChoice::CandidateA)),
            Arc::new(InMemoryDocuments::new()),
        ),
    );

    let err = provider.initialize().await.unwrap_err();
    assert_eq!(err.to_string(), "host did not respond");
    assert!(provider.initialize().await.is_err());
    assert!(!provider.is_ready());
    assert_eq!(channel.requests(), 1);
}

#[tokio::test]
async fn test_large_state_round_trips_through_attachment() {
    let fx = simple(runtime("own"));
    let state = json!({"blob": "x".repeat(500 * 1024)});

    let receipt = fx
        .provider
        .save(&CloudContent::new(state.clone()), &CloudMetadata::default())
        .await
        .unwrap();

    assert_eq!(receipt.status, 200);
    assert_eq!(fx.host.attachment_count(), 1);
    let stored = fx.host.committed_state().unwrap();
    assert!(StateReference::is_reference(&stored));
    assert!(!fx.host.has_pending());
    assert_eq!(load(&fx).await, state);
}

#[tokio::test]
async fn test_small_state_is_inline() {
    let fx = simple(runtime("own"));
    fx.provider
        .save(&CloudContent::new(json!({"small": 1})), &CloudMetadata::default())
        .await
        .unwrap();

    assert_eq!(fx.host.attachment_count(), 0);
    assert_eq!(fx.host.committed_state(), Some(json!({"small": 1})));
}

#[tokio::test]
async fn test_launch_directive_forces_attachment() {
    let config = ProviderConfig::default()
        .with_launch(&LaunchParams::from_query("?interactiveApi=attachment"));
    let fx = fixture(runtime("own"), config, ConflictChoice::CandidateA);

    fx.provider
        .save(&CloudContent::new(json!("short note")), &CloudMetadata::default())
        .await
        .unwrap();

    assert_eq!(fx.host.attachment(Some("own".into()), "file.json").as_deref(), Some("short note"));
    assert_eq!(load(&fx).await, json!("short note"));
}

#[tokio::test]
async fn test_attachment_write_failure_persists_nothing() {
    let fx = simple(runtime("own"));
    fx.host.fail_attachment_writes("Payload Too Large");
    let state = json!({"blob": "y".repeat(500 * 1024)});

    let err = fx
        .provider
        .save(&CloudContent::new(state), &CloudMetadata::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Payload Too Large");
    assert_eq!(fx.host.committed_state(), None);
    assert_eq!(fx.host.flush_count(), 0);
}

#[tokio::test]
async fn test_attachment_read_failure_surfaces_on_load() {
    let fx = simple(runtime("own"));
    fx.provider
        .save(
            &CloudContent::new(json!({"blob": "z".repeat(500 * 1024)})),
            &CloudMetadata::default(),
        )
        .await
        .unwrap();
    fx.host.fail_attachment_reads("Forbidden");

    let err = fx.provider.load(CloudMetadata::default()).await.unwrap_err();
    assert_eq!(err.to_string(), r#"error reading attachment contents: "Forbidden""#);
}

#[tokio::test]
async fn test_load_rewrites_urls_to_host_domain() {
    let mut handshake = runtime("own");
    handshake.host_domain = Some("learn.example.org".into());
    handshake.current_state = Some(json!({
        "src": "https://old.example.org/sensor-interactive/run.html",
        "other": "https://old.example.org/elsewhere"
    }));
    let fx = simple(handshake);

    assert_eq!(
        load(&fx).await,
        json!({
            "src": "https://learn.example.org/sensor-interactive/run.html",
            "other": "https://old.example.org/elsewhere"
        })
    );
}

#[tokio::test]
async fn test_open_saved_prefers_interactive_state() {
    let mut handshake = runtime("own");
    handshake.host_domain = Some("learn.example.org".into());
    let fx = simple(handshake);
    fx.documents.insert("doc", json!({"from": "document"}));

    let opened = fx
        .provider
        .open_saved(OpenSavedParams {
            document_id: Some("doc".into()),
            interactive_state: Some(json!({"url": "http://a.example.org/sensor-interactive/x"})),
        })
        .await
        .unwrap();

    assert_eq!(
        opened.content.content(),
        &json!({"url": "http://learn.example.org/sensor-interactive/x"})
    );
    assert!(fx.documents.fetches().is_empty());
    assert_eq!(opened.metadata.provider.as_deref(), Some(InteractiveApiProvider::NAME));
    let data = opened.metadata.provider_data.unwrap();
    assert_eq!(data.document_id.as_deref(), Some("doc"));
    assert!(data.interactive_state.is_none());
}

#[tokio::test]
async fn test_open_saved_falls_back_to_shared_document() {
    let fx = simple(runtime("own"));
    fx.documents.insert("doc", json!({"from": "document"}));

    let opened = fx
        .provider
        .open_saved(OpenSavedParams {
            document_id: Some("doc".into()),
            interactive_state: Some(json!({})),
        })
        .await
        .unwrap();

    assert_eq!(opened.content.content(), &json!({"from": "document"}));
    assert_eq!(fx.host.committed_state(), Some(json!({"from": "document"})));
}

#[tokio::test]
async fn test_open_saved_missing_document_fails() {
    let fx = simple(runtime("own"));

    let err = fx
        .provider
        .open_saved(OpenSavedParams {
            document_id: Some("gone".into()),
            interactive_state: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::OpenFailed(_)));
    assert_eq!(err.to_string(), "unable to open saved document: gone");
    assert_eq!(fx.host.committed_state(), None);
}

#[tokio::test]
async fn test_open_saved_empty_document_fails() {
    let fx = simple(runtime("own"));
    fx.documents.insert("blank", json!(""));

    let err = fx
        .provider
        .open_saved(OpenSavedParams {
            document_id: Some("blank".into()),
            interactive_state: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "unable to open saved document: blank");
}

#[tokio::test]
async fn test_open_saved_with_nothing_starts_empty() {
    let fx = simple(runtime("own"));

    let opened = fx
        .provider
        .open_saved(OpenSavedParams::default())
        .await
        .unwrap();

    assert_eq!(opened.content.content(), &json!(""));
    assert_eq!(fx.host.committed_state(), Some(json!("")));
}

#[tokio::test]
async fn test_initialize_then_open_saved() {
    let mut handshake = runtime("own");
    handshake.linked_states = vec![LinkedStateEntry::new("prev", json!({"step": 4}))];
    let config = ProviderConfig {
        document_id: Some("doc".into()),
        ..ProviderConfig::default()
    };
    let fx = fixture(handshake, config, ConflictChoice::CandidateA);

    let params = fx.provider.initialize().await.unwrap();
    assert_eq!(params.document_id.as_deref(), Some("doc"));

    let opened = fx.provider.open_saved(params).await.unwrap();
    assert_eq!(opened.content.content(), &json!({"step": 4}));
    assert!(fx.documents.fetches().is_empty());
}

#[tokio::test]
async fn test_unparseable_attachment_loads_as_no_content() {
    let mut handshake = runtime("own");
    handshake.current_state =
        Some(StateReference::new("file.json", istate_types::ContentType::Json).to_state());
    let fx = simple(handshake);
    fx.host.seed_attachment(
        Some("own".into()),
        "file.json",
        "{not json",
        istate_types::ContentType::Json,
    );

    let opened = fx.provider.load(CloudMetadata::default()).await.unwrap();
    assert_eq!(opened.content.content(), &Value::Null);
}

#[tokio::test]
async fn test_missing_own_attachment_initializes_without_state() {
    let mut handshake = runtime("own");
    handshake.current_state =
        Some(StateReference::new("file.json", istate_types::ContentType::Json).to_state());
    let fx = simple(handshake);

    let params = fx.provider.initialize().await.unwrap();
    assert_eq!(params.interactive_state, None);
    assert!(fx.provider.is_ready());
}
