//! Integration tests for the Tryton gateway client over real HTTP
//!
//! **Purpose**: Test the critical path from portal call → session management
//! → network → decoded result
//!
//! **Coverage:**
//! - Session header derivation, caching, and reuse across calls
//! - Expired session: 401 mid-flight → reset → exactly one retried call
//! - Persistent auth failure: terminal error after a single retry, never a
//!   third attempt
//! - Discovery methods: root endpoint, no session header, bare-array bodies
//! - Response cache: repeated reads collapse to one dispatched call
//! - Credential validation: probe logins leave the service session intact
//! - HTML error pages: body preserved for message extraction
//!
//! **Infrastructure:**
//! - WireMock HTTP server (simulates the Tryton JSON-RPC endpoint)
//! - TrytonClient with real transport, sessions, and cache

use std::time::Duration;

use portico_domain::{ErpConfig, PorticoError};
use portico_infra::integrations::tryton::TrytonClient;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// base64("u:7:tok-abc"), the session header for the test service account
const SESSION_HEADER: &str = "Session dTo3OnRvay1hYmM=";

// ============================================================================
// Test Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn test_config(base_url: String) -> ErpConfig {
    ErpConfig {
        base_url,
        database: "portal".to_string(),
        username: "u".to_string(),
        password: "secret".to_string(),
        timeout_secs: 5,
        retry_attempts: 1,
        cache_ttl_secs: 300,
    }
}

/// RPC method names of every request the server received, in order
async fn rpc_methods(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .map(|request| {
            let body: Value =
                serde_json::from_slice(&request.body).expect("RPC bodies are JSON");
            body["method"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

fn count_of(methods: &[String], name: &str) -> usize {
    methods.iter().filter(|m| m.as_str() == name).count()
}

async fn mount_service_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "common.db.login", "params": ["u"] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": [7, "tok-abc"] })),
        )
        .mount(server)
        .await;
}

// ============================================================================
// Session Lifecycle
// ============================================================================

#[tokio::test]
async fn test_session_header_cached_across_calls() {
    init_tracing();
    let server = MockServer::start().await;
    mount_service_login(&server).await;

    // The search mock only matches requests carrying the derived header, so
    // a missing or wrong header shows up as a 404 from WireMock.
    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "model.res.partner.search" })))
        .and(header("authorization", SESSION_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [42] })))
        .expect(2)
        .mount(&server)
        .await;

    let client = TrytonClient::new(test_config(server.uri())).unwrap();

    for _ in 0..2 {
        let result =
            client.call("model.res.partner", "search", vec![json!([[]])]).await.unwrap();
        assert_eq!(result, json!([42]));
    }

    let methods = rpc_methods(&server).await;
    assert_eq!(count_of(&methods, "common.db.login"), 1, "session must be established once");
    assert_eq!(count_of(&methods, "model.res.partner.search"), 2);
}

#[tokio::test]
async fn test_expired_session_triggers_single_reauth() {
    init_tracing();
    let server = MockServer::start().await;
    mount_service_login(&server).await;

    // First search is rejected as if the session had expired server-side;
    // the mock stops matching after one response and the success mock takes
    // over.
    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "model.res.user.search" })))
        .respond_with(ResponseTemplate::new(401).set_body_string("Session expired"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "model.res.user.search" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [11] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = TrytonClient::new(test_config(server.uri())).unwrap();
    let result = client.call("model.res.user", "search", vec![json!([[]])]).await.unwrap();
    assert_eq!(result, json!([11]));

    let methods = rpc_methods(&server).await;
    assert_eq!(count_of(&methods, "common.db.login"), 2, "retry must force a fresh login");
    assert_eq!(count_of(&methods, "model.res.user.search"), 2);

    // Each dispatched request carries its own correlation id, so the retried
    // call is distinguishable from a duplicate.
    let ids: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            body["id"].as_str().unwrap().to_string()
        })
        .collect();
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "correlation ids must be fresh per request");
}

#[tokio::test]
async fn test_persistent_auth_failure_is_terminal_after_one_retry() {
    init_tracing();
    let server = MockServer::start().await;
    mount_service_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "model.res.user.search" })))
        .respond_with(ResponseTemplate::new(401).set_body_string("Session expired"))
        .expect(2)
        .mount(&server)
        .await;

    let client = TrytonClient::new(test_config(server.uri())).unwrap();
    let err = client.call("model.res.user", "search", vec![json!([[]])]).await.unwrap_err();

    assert!(matches!(err, PorticoError::Auth(_)));
    assert!(err.to_string().contains("after retrying"));

    let methods = rpc_methods(&server).await;
    assert_eq!(
        count_of(&methods, "model.res.user.search"),
        2,
        "one retry and no more, even when the gateway keeps rejecting"
    );
    assert_eq!(count_of(&methods, "common.db.login"), 2);
}

#[tokio::test]
async fn test_rejected_service_login_fails_without_data_calls() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "common.db.login" })))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .expect(2)
        .mount(&server)
        .await;

    let client = TrytonClient::new(test_config(server.uri())).unwrap();
    let err = client.call("model.res.user", "search", vec![json!([[]])]).await.unwrap_err();

    assert!(matches!(err, PorticoError::Auth(_)));

    let methods = rpc_methods(&server).await;
    assert_eq!(count_of(&methods, "common.db.login"), 2);
    assert_eq!(
        count_of(&methods, "model.res.user.search"),
        0,
        "data calls must not go out without a session"
    );
}

// ============================================================================
// Discovery Methods
// ============================================================================

#[tokio::test]
async fn test_discovery_skips_session_and_decodes_bare_array() {
    init_tracing();
    let server = MockServer::start().await;
    mount_service_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "model.res.partner.search" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [1] })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({ "method": "common.db.list" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["portal", "demo"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = TrytonClient::new(test_config(server.uri())).unwrap();

    // Establish a session first: discovery must stay anonymous even then.
    client.call("model.res.partner", "search", vec![json!([[]])]).await.unwrap();

    let databases = client.list_databases().await.unwrap();
    assert_eq!(databases, vec!["portal".to_string(), "demo".to_string()]);

    let requests = server.received_requests().await.unwrap();
    let discovery = requests
        .iter()
        .find(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            body["method"] == "common.db.list"
        })
        .expect("the discovery request was dispatched");
    assert!(
        !discovery.headers.contains_key("authorization"),
        "discovery must not carry a session header even with a live session"
    );

    let methods = rpc_methods(&server).await;
    assert_eq!(count_of(&methods, "common.db.login"), 1, "discovery must not trigger a login");
}

#[tokio::test]
async fn test_server_version_and_ping() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({ "method": "common.server.version" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "6.8.0" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({ "method": "common.db.list" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["portal"])))
        .mount(&server)
        .await;

    let client = TrytonClient::new(test_config(server.uri())).unwrap();

    assert_eq!(client.server_version().await.unwrap(), "6.8.0");
    assert!(client.ping().await);
}

#[tokio::test]
async fn test_ping_is_false_when_gateway_is_down() {
    init_tracing();
    // Bind then drop a server so the port refuses connections.
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = TrytonClient::new(test_config(uri)).unwrap();
    assert!(!client.ping().await);
}

// ============================================================================
// Response Cache
// ============================================================================

#[tokio::test]
async fn test_cached_call_collapses_repeat_reads() {
    init_tracing();
    let server = MockServer::start().await;
    mount_service_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "model.country.country.search_read" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [{ "id": 1, "code": "FR" }, { "id": 2, "code": "DE" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = TrytonClient::new(test_config(server.uri())).unwrap();

    // Same request parameters spelled with different map key orders; the
    // canonical cache key makes them one entry.
    let first = client
        .cached_call(
            "model.country.country",
            "search_read",
            vec![json!([[]]), json!({ "order": "code", "limit": 10 })],
            Some(Duration::from_secs(60)),
        )
        .await
        .unwrap();
    let second = client
        .cached_call(
            "model.country.country",
            "search_read",
            vec![json!([[]]), json!({ "limit": 10, "order": "code" })],
            Some(Duration::from_secs(60)),
        )
        .await
        .unwrap();

    assert_eq!(first, second);

    let methods = rpc_methods(&server).await;
    assert_eq!(
        count_of(&methods, "model.country.country.search_read"),
        1,
        "the second read must be served from the cache"
    );
}

// ============================================================================
// Credential Validation
// ============================================================================

#[tokio::test]
async fn test_validate_credentials_keeps_service_session() {
    init_tracing();
    let server = MockServer::start().await;
    mount_service_login(&server).await;

    // Probe logins use the portal user's credentials and are rejected.
    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({
            "method": "common.db.login",
            "params": ["client@example.com"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "model.res.partner.search" })))
        .and(header("authorization", SESSION_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [1] })))
        .expect(2)
        .mount(&server)
        .await;

    let client = TrytonClient::new(test_config(server.uri())).unwrap();

    client.call("model.res.partner", "search", vec![json!([[]])]).await.unwrap();

    let valid = client.validate_credentials("client@example.com", "wrong").await.unwrap();
    assert!(!valid);

    // The service session survives the failed probe untouched.
    client.call("model.res.partner", "search", vec![json!([[]])]).await.unwrap();

    let methods = rpc_methods(&server).await;
    assert_eq!(count_of(&methods, "common.db.login"), 2, "one service login plus one probe");
}

// ============================================================================
// Error Bodies
// ============================================================================

#[tokio::test]
async fn test_http_error_page_yields_extractable_message() {
    init_tracing();
    let server = MockServer::start().await;
    mount_service_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/portal/"))
        .and(body_partial_json(json!({ "method": "model.res.user.create" })))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "<html><body><h1>Bad Request</h1><p>The password is too short.</p></body></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = TrytonClient::new(test_config(server.uri())).unwrap();
    let err =
        client.call("model.res.user", "create", vec![json!([{ "name": "X" }])]).await.unwrap_err();

    let failure = match err {
        PorticoError::Rpc(failure) => failure,
        other => panic!("expected Rpc error, got {other:?}"),
    };
    assert_eq!(failure.code, Some(400));

    let body = failure.data.as_ref().and_then(|data| data["body"].as_str()).unwrap();
    let message = portico_core::utils::html::extract_error_message(body, "fallback");
    assert_eq!(message, "The password is too short.");
}
