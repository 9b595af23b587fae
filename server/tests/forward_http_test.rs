//! Integration Tests for Envelope Delivery
//!
//! Run with: `cargo test --test forward_http_test`

mod helpers;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use helpers::{spawn_test_server, ServerKeys, SERVER_CALLBACK_URL};
use relay_common::Envelope;
use relay_crypto::{canonical, sealed, signing, BrokerKeys};
use relay_server::relay::forward::{post_envelope, EnvelopeTransport, ForwardError, Forwarder};
use relay_server::workspaces::{WorkspaceRecord, WorkspaceStatus};
use serde_json::json;

type Captured = Arc<Mutex<Option<(HeaderMap, String)>>>;

async fn capture(State(seen): State<Captured>, headers: HeaderMap, body: String) -> StatusCode {
    *seen.lock().unwrap() = Some((headers, body));
    StatusCode::OK
}

/// Plain-HTTP transport to a local mock, ignoring the record's URL.
/// The client carries no timeout of its own.
struct LoopbackTransport {
    target: String,
}

#[async_trait::async_trait]
impl EnvelopeTransport for LoopbackTransport {
    async fn deliver(
        &self,
        _server_url: &str,
        envelope: &Envelope,
        _timeout: Duration,
    ) -> Result<u16, ForwardError> {
        post_envelope(&reqwest::Client::new(), &self.target, envelope).await
    }
}

fn loopback_forwarder(keys: Arc<BrokerKeys>, target: String, timeout: Duration) -> Forwarder {
    Forwarder::new(keys, timeout).with_transport(Arc::new(LoopbackTransport { target }))
}

fn record_for(server: &ServerKeys) -> WorkspaceRecord {
    WorkspaceRecord {
        workspace_id: "T0FWD".into(),
        team_name: "Forward".into(),
        status: WorkspaceStatus::Active,
        server_url: SERVER_CALLBACK_URL.into(),
        server_pubkey: server.pubkey_b64(),
        server_signing_pubkey: server.signing_pubkey_b64(),
        bot_token: String::new(),
        auth_code_hash: String::new(),
        updated_at: chrono::Utc::now(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_envelope_delivery_headers_and_body() {
    let seen = Captured::default();
    let router = Router::new()
        .route("/relay", post(capture))
        .with_state(seen.clone());
    let mock = spawn_test_server(router).await;

    let keys = Arc::new(BrokerKeys::from_seed([8u8; 32]));
    let forwarder = Forwarder::new(keys.clone(), Duration::from_secs(2));
    let server = ServerKeys::from_seed(6);
    let event = json!({ "type": "event_callback", "event": { "text": "hello" } });
    let envelope = forwarder
        .build_envelope(&event, &record_for(&server), 1_700_000_000)
        .unwrap();

    let status = post_envelope(
        &reqwest::Client::new(),
        &format!("{}/relay", mock.url),
        &envelope,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);

    let (headers, body) = seen.lock().unwrap().take().expect("nothing delivered");
    assert_eq!(headers["x-relay-signature"], envelope.signature.as_str());
    assert_eq!(headers["x-relay-timestamp"], "1700000000");
    assert_eq!(headers["x-relay-workspace"], "T0FWD");

    // What the server does on receipt: verify, then open.
    let received: Envelope = serde_json::from_str(&body).unwrap();
    assert!(signing::verify(
        &canonical::envelope_payload(&received.workspace_id, received.timestamp, &received.encrypted),
        &received.signature,
        &keys.signing_public_b64(),
    ));
    let opened = sealed::unseal(
        &received.encrypted,
        &server.box_secret.public_key(),
        &server.box_secret,
    )
    .unwrap();
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&opened).unwrap(), event);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_non_success_status_is_reported() {
    let router = Router::new().route("/relay", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let mock = spawn_test_server(router).await;

    let envelope = Envelope {
        workspace_id: "T0FWD".into(),
        encrypted: "AAAA".into(),
        timestamp: 1,
        signature: "sig".into(),
    };
    let err = post_envelope(
        &reqwest::Client::new(),
        &format!("{}/relay", mock.url),
        &envelope,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ForwardError::Status(503)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_forwarder_delivers_to_server() {
    let seen = Captured::default();
    let router = Router::new()
        .route("/relay", post(capture))
        .with_state(seen.clone());
    let mock = spawn_test_server(router).await;

    let keys = Arc::new(BrokerKeys::from_seed([8u8; 32]));
    let forwarder = loopback_forwarder(
        keys.clone(),
        format!("{}/relay", mock.url),
        Duration::from_secs(2),
    );
    let server = ServerKeys::from_seed(6);
    let event = json!({ "type": "event_callback", "event": { "text": "ping" } });

    let status = forwarder.forward(&event, &record_for(&server)).await.unwrap();
    assert_eq!(status, 200);

    let (headers, body) = seen.lock().unwrap().take().expect("nothing delivered");
    assert_eq!(headers["x-relay-workspace"], "T0FWD");
    let received: Envelope = serde_json::from_str(&body).unwrap();
    assert_eq!(
        server.open_envelope(&received, &keys.signing_public_b64()),
        event
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_server_times_out() {
    let router = Router::new().route(
        "/relay",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    );
    let mock = spawn_test_server(router).await;

    let forwarder = loopback_forwarder(
        Arc::new(BrokerKeys::from_seed([8u8; 32])),
        format!("{}/relay", mock.url),
        Duration::from_millis(200),
    );
    let server = ServerKeys::from_seed(6);

    let started = std::time::Instant::now();
    let err = forwarder
        .forward(&json!({ "type": "event_callback" }), &record_for(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, ForwardError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(2));
}
