//! Vault session behavior against a local HTTP server

use chrono::Utc;
use serde_json::{Value, json};
use std::time::Duration;
use vaultstep_secrets::{
    BackendConnector, BackendErrorKind, BackendOperation, BackendSession, SecureSecret,
    SessionOptions, SessionState, VaultCredential,
};
use vaultstep_vault::{VaultConnector, VaultSession};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connect(server: &MockServer) -> VaultSession {
    connect_with(server, &SessionOptions::default())
}

fn connect_with(server: &MockServer, options: &SessionOptions) -> VaultSession {
    let state = SessionState::initialize(server.uri()).unwrap();
    VaultSession::connect(state, options).unwrap()
}

/// Envelope Vault wraps around every response body
fn envelope(data: Value, auth: Value) -> Value {
    json!({
        "request_id": "7d1c1a5e-0000-0000-0000-000000000000",
        "lease_id": "",
        "lease_duration": 0,
        "renewable": false,
        "data": data,
        "auth": auth,
        "warnings": null,
        "wrap_info": null
    })
}

fn auth_info(token: &str, lease_seconds: u64) -> Value {
    json!({
        "client_token": token,
        "accessor": "accessor-1",
        "policies": ["default", "ci"],
        "token_policies": ["default", "ci"],
        "metadata": null,
        "lease_duration": lease_seconds,
        "renewable": true,
        "entity_id": "",
        "token_type": "service",
        "orphan": true
    })
}

fn kv2_body(data: Value) -> Value {
    envelope(
        json!({
            "data": data,
            "metadata": {
                "created_time": "2026-01-01T00:00:00Z",
                "deletion_time": "",
                "custom_metadata": null,
                "destroyed": false,
                "version": 3
            }
        }),
        Value::Null,
    )
}

fn api_errors(errors: &[&str]) -> Value {
    json!({ "errors": errors })
}

fn assert_expires_in(session: &VaultSession, seconds: i64) {
    let expiry = session.state().token_expiry().unwrap();
    let remaining = (expiry - Utc::now()).num_seconds();
    assert!(
        (seconds - 60..=seconds).contains(&remaining),
        "expected about {seconds}s left, got {remaining}s"
    );
}

#[tokio::test]
async fn kv2_read_decodes_secret_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/team/db"))
        .and(header("X-Vault-Token", "hvs.pipeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kv2_body(json!({
            "password": "s3cr3t",
            "port": 5432
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = connect(&server);
    session
        .authenticate(Some(&VaultCredential::token("hvs.pipeline")))
        .await
        .unwrap();
    let secret = session.read("secret/team/db", 2).await.unwrap();

    assert_eq!(secret.get("password"), Some("s3cr3t"));
    assert_eq!(secret.get("port"), Some("5432"));
    assert_eq!(secret.len(), 2);
}

#[tokio::test]
async fn kv1_read_uses_plain_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "r-1",
            "lease_id": "",
            "lease_duration": 2_764_800,
            "renewable": false,
            "auth": null,
            "data": { "api_key": "abc123" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server);
    let secret = session.read("kv/app", 1).await.unwrap();
    assert_eq!(secret.get("api_key"), Some("abc123"));
}

#[tokio::test]
async fn missing_secret_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(api_errors(&[])))
        .mount(&server)
        .await;

    let err = connect(&server).read("secret/gone", 2).await.unwrap_err();
    assert_eq!(err.kind, BackendErrorKind::NotFound);
    assert_eq!(err.operation, BackendOperation::Read);
    assert_eq!(err.message, "server responded with status 404");
}

#[tokio::test]
async fn forbidden_read_keeps_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/locked"))
        .respond_with(ResponseTemplate::new(403).set_body_json(api_errors(&["permission denied"])))
        .mount(&server)
        .await;

    let err = connect(&server).read("secret/locked", 2).await.unwrap_err();
    assert_eq!(err.kind, BackendErrorKind::PermissionDenied);
    assert_eq!(err.message, "permission denied (status 403)");
    assert!(err.source_type().unwrap().contains("ClientError"));
}

#[tokio::test]
async fn approle_login_adopts_client_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_partial_json(json!({
            "role_id": "role-1",
            "secret_id": "secret-1"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(Value::Null, auth_info("hvs.from-approle", 3600))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = connect(&server);
    session
        .authenticate(Some(&VaultCredential::approle("role-1", "secret-1")))
        .await
        .unwrap();

    assert_eq!(
        session.state().token().map(SecureSecret::expose),
        Some("hvs.from-approle")
    );
    assert_expires_in(&session, 3600);
}

#[tokio::test]
async fn userpass_login_uses_custom_mount() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/ldap-users/login/deploy"))
        .and(body_partial_json(json!({ "password": "hunter2" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(Value::Null, auth_info("hvs.from-userpass", 600))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let credential = VaultCredential::userpass("deploy", "hunter2").with_mount("ldap-users");
    let mut session = connect(&server);
    session.authenticate(Some(&credential)).await.unwrap();

    assert_eq!(
        session.state().token().map(SecureSecret::expose),
        Some("hvs.from-userpass")
    );
    assert_expires_in(&session, 600);
}

#[tokio::test]
async fn rejected_login_leaves_session_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(api_errors(&["invalid role or secret ID"])))
        .mount(&server)
        .await;

    let mut session = connect(&server);
    let err = session
        .authenticate(Some(&VaultCredential::approle("role-1", "wrong")))
        .await
        .unwrap_err();

    assert_eq!(err.operation, BackendOperation::Authenticate);
    assert_eq!(err.kind, BackendErrorKind::Rejected);
    assert!(err.message.contains("invalid role or secret ID"));
    assert!(!session.state().is_authenticated());
}

#[tokio::test]
async fn renew_sends_increment_in_seconds_and_extends_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/renew-self"))
        .and(header("X-Vault-Token", "hvs.pipeline"))
        .and(body_partial_json(json!({ "increment": "86400s" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(Value::Null, auth_info("hvs.pipeline", 86_400))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = connect(&server);
    session
        .authenticate(Some(&VaultCredential::token("hvs.pipeline")))
        .await
        .unwrap();
    assert!(session.state().token_expiry().is_none());

    session.renew(24).await.unwrap();
    assert_expires_in(&session, 86_400);
    assert_eq!(
        session.state().token().map(SecureSecret::expose),
        Some("hvs.pipeline")
    );
}

#[tokio::test]
async fn renew_failure_is_reported_as_renewal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/renew-self"))
        .respond_with(ResponseTemplate::new(400).set_body_json(api_errors(&["lease is not renewable"])))
        .mount(&server)
        .await;

    let mut session = connect(&server);
    session
        .authenticate(Some(&VaultCredential::token("hvs.root")))
        .await
        .unwrap();
    let err = session.renew(1).await.unwrap_err();

    assert!(err.is_renewal());
    assert_eq!(err.message, "lease is not renewable (status 400)");
}

#[tokio::test]
async fn namespace_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .and(header("X-Vault-Namespace", "platform"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kv2_body(json!({ "k": "v" }))))
        .expect(1)
        .mount(&server)
        .await;

    let options = SessionOptions {
        namespace: Some("platform".to_string()),
        request_timeout: None,
    };
    let secret = connect_with(&server, &options)
        .read("secret/app", 2)
        .await
        .unwrap();
    assert_eq!(secret.get("k"), Some("v"));
}

#[tokio::test]
async fn slow_server_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(kv2_body(json!({ "k": "v" })))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let options = SessionOptions {
        namespace: None,
        request_timeout: Some(Duration::from_millis(100)),
    };
    let err = connect_with(&server, &options)
        .read("secret/app", 2)
        .await
        .unwrap_err();
    assert_eq!(err.kind, BackendErrorKind::Network);
    assert!(err.message.contains("100ms"));
}

#[tokio::test]
async fn connector_sessions_talk_to_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kv2_body(json!({ "k": "v" }))))
        .expect(1)
        .mount(&server)
        .await;

    let state = SessionState::initialize(server.uri()).unwrap();
    let session = VaultConnector::new()
        .connect(state, &SessionOptions::default())
        .unwrap();
    let secret = session.read("secret/app", 2).await.unwrap();
    assert_eq!(secret.get("k"), Some("v"));
}
