//! End-to-end tests against a mock token endpoint
//!
//! Exercise `TokenClient` and `TokenManager` over the reqwest executor,
//! including form encoding, status classification, timeouts and cancellation.

use std::sync::Arc;
use std::time::Duration;

use oauth2_token_client::{
    server_config, CancellationToken, CredentialStore, InMemoryAccountStore, OAuth2Error,
    ServerConfiguration, TokenClient, TokenManager, TransportError,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ServerConfiguration {
    server_config()
        .base_url(format!("{}/api", server.uri()))
        .token_endpoint("/tokens")
        .client_id("my-app")
        .client_secret("app-secret")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn token_body(access_token: &str, expires_in: i64) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "scope": "read",
        "expires_in": expires_in,
        "refresh_token": "refresh-1"
    })
}

#[tokio::test]
async fn test_password_grant_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("client_id=my-app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("abc", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let client = TokenClient::new(config_for(&server)).unwrap();
    let token = client
        .get_user_access_token("alice", "secret", Some("read"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(token.token(), "abc");
    assert_eq!(token.token_type(), "bearer");
    assert_eq!(token.scope(), Some("read"));
    assert_eq!(token.refresh_token(), Some("refresh-1"));
    assert!(!token.is_expired());
}

#[tokio::test]
async fn test_client_credentials_grant_error_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_secret=app-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "invalid_scope",
            "error_description": "Scope `admin` is not allowed"
        })))
        .mount(&server)
        .await;

    let client = TokenClient::new(config_for(&server)).unwrap();
    let err = client
        .get_client_access_token(Some("admin"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        OAuth2Error::Grant {
            description: "Scope `admin` is not allowed".to_string()
        }
    );
}

#[tokio::test]
async fn test_non_success_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let client = TokenClient::new(config_for(&server)).unwrap();
    let err = client
        .refresh_token("expired-refresh", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        OAuth2Error::Http {
            status: 400,
            message: "Bad Request".to_string()
        }
    );
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("late", 3600))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server).with_timeout(Some(Duration::from_millis(200)));
    let client = TokenClient::new(config).unwrap();

    let err = client
        .get_client_access_token(None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OAuth2Error::Transport(TransportError::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_cancel_in_flight_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("late", 3600))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = TokenClient::new(config_for(&server)).unwrap();
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        })
    };

    let started = std::time::Instant::now();
    let err = client
        .get_client_access_token(None, &cancel)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(err, OAuth2Error::Canceled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_manager_sign_in_then_refresh() {
    let server = MockServer::start().await;

    // Expires inside the default five minute refresh window.
    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("first", 60)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "second",
            "token_type": "bearer",
            "expires_in": "3600"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::new(
        TokenClient::new(config_for(&server)).unwrap(),
        Arc::new(CredentialStore::new(Arc::new(InMemoryAccountStore::new()))),
    );
    let cancel = CancellationToken::new();

    let first = manager
        .sign_in("alice", "secret", Some("read"), "my-service", &cancel)
        .await
        .unwrap();
    assert_eq!(first.token(), "first");

    let second = manager
        .user_access_token("alice", "my-service", &cancel)
        .await
        .unwrap();
    assert_eq!(second.token(), "second");
    assert_eq!(second.refresh_token(), Some("refresh-1"));

    // The refreshed token is now stored and outside the window.
    let third = manager
        .user_access_token("ALICE", "my-service", &cancel)
        .await
        .unwrap();
    assert_eq!(third, second);
}
