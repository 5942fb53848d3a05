//! Integration tests for editor sessions driving discovery

use async_trait::async_trait;
use connector_forms_core::config::PollOverride;
use connector_forms_core::{
    DiscoveryKind, DiscoveryRequest, DiscoveryResponse, DiscoveryTransport, EditorSession,
    EngineSettings, Error, ParameterSpec, PollOutcome, Schema, SchemaBuilder, TypeTag,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Connector that stays pending for a number of calls per kind, then answers
struct SlowConnector {
    pending_calls: usize,
    calls: AtomicUsize,
    payloads: Mutex<Vec<Value>>,
}

impl SlowConnector {
    fn new(pending_calls: usize) -> Arc<Self> {
        Arc::new(Self {
            pending_calls,
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl DiscoveryTransport for SlowConnector {
    async fn discover(&self, request: &DiscoveryRequest) -> anyhow::Result<DiscoveryResponse> {
        self.payloads.lock().unwrap().push(request.payload.clone());
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.pending_calls {
            return Ok(DiscoveryResponse::Pending);
        }
        let payload = match request.kind {
            DiscoveryKind::Spec => json!({
                "connectionSpecification": {
                    "required": ["host"],
                    "properties": {
                        "host": {"type": "string", "title": "Host"},
                        "password": {"type": "string", "writeOnly": true},
                        "ssl": {"type": "boolean", "default": false}
                    }
                }
            }),
            DiscoveryKind::Streams => json!({"streams": [{"name": "orders"}, "users"]}),
            DiscoveryKind::ConnectionTest => json!({"message": "ok"}),
        };
        Ok(DiscoveryResponse::Ready { payload })
    }
}

fn base_schema() -> Schema {
    SchemaBuilder::new()
        .spec(ParameterSpec::new("name", TypeTag::String).with_required(true))
        .spec(ParameterSpec::new("kind", TypeTag::String).with_constant("source"))
        .build()
        .unwrap()
}

fn fast_settings() -> EngineSettings {
    let mut settings = EngineSettings::default();
    settings.poll.interval_ms = 50;
    settings.poll.timeout_ms = 1_000;
    settings
}

#[tokio::test(start_paused = true)]
async fn test_discovery_extends_form() {
    let connector = SlowConnector::new(2);
    let mut session = EditorSession::with_settings(base_schema(), connector.clone(), fast_settings());
    session.set_value("name", json!("warehouse")).unwrap();

    let resolution = session.discover(DiscoveryKind::Spec, "postgres").await.unwrap();

    let ids: Vec<&str> = session.schema().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["name", "kind", "config.host", "config.password", "config.ssl"]
    );
    assert_eq!(
        session.schema().get("config.password").unwrap().type_tag,
        TypeTag::Password
    );
    assert_eq!(resolution.missing_required(), vec!["config.host"]);
    assert_eq!(connector.calls.load(Ordering::SeqCst), 3);

    // Discovery is sent the static part of the configuration
    let payloads = connector.payloads.lock().unwrap();
    assert_eq!(payloads[0], json!({"name": "warehouse", "kind": "source"}));
}

#[tokio::test(start_paused = true)]
async fn test_streams_after_spec() {
    let connector = SlowConnector::new(0);
    let mut session = EditorSession::with_settings(base_schema(), connector, fast_settings());

    session.discover(DiscoveryKind::Spec, "postgres").await.unwrap();
    let resolution = session
        .discover(DiscoveryKind::Streams, "postgres")
        .await
        .unwrap();

    let streams = session.schema().get("streams").unwrap();
    assert_eq!(streams.options, vec![json!("orders"), json!("users")]);
    assert_eq!(resolution.get("streams").unwrap().effective_value, Some(json!([])));
    assert_eq!(session.schema().len(), 6);

    assert!(session.discard_fragment(DiscoveryKind::Spec, "postgres").unwrap());
    assert_eq!(session.schema().len(), 3);
    assert!(session.schema().get("streams").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_keeps_schema() {
    let connector = SlowConnector::new(usize::MAX);
    let mut settings = fast_settings();
    settings.discovery.insert(
        "spec".to_string(),
        PollOverride {
            interval_ms: Some(100),
            timeout_ms: Some(300),
        },
    );
    let mut session = EditorSession::with_settings(base_schema(), connector.clone(), settings);

    let err = session
        .discover(DiscoveryKind::Spec, "postgres")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DiscoveryTimeout { .. }));
    assert_eq!(session.schema().len(), 2);
    assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_running_discovery() {
    let connector = SlowConnector::new(usize::MAX);
    let mut session = EditorSession::with_settings(base_schema(), connector, fast_settings());

    let poller = session
        .start_discovery(DiscoveryKind::Spec, "postgres")
        .unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(poller.is_running());

    assert_eq!(session.cancel_discovery(DiscoveryKind::Spec, "postgres"), 1);
    assert!(matches!(poller.wait().await.unwrap(), PollOutcome::Cancelled));
    assert_eq!(session.schema().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connection_check() {
    let connector = SlowConnector::new(1);
    let mut session = EditorSession::with_settings(base_schema(), connector.clone(), fast_settings());
    session.set_value("name", json!("warehouse")).unwrap();

    let status = session.test_connection("postgres").await.unwrap();
    assert_eq!(status.connector, "postgres");
    assert_eq!(status.message.as_deref(), Some("ok"));
    assert_eq!(
        connector.payloads.lock().unwrap().last(),
        Some(&json!({"name": "warehouse", "kind": "source"}))
    );
}
