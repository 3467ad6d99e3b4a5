// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use common::{auth_service, seed_credential, token_body};
use tempfile::TempDir;
use volvo_exporter::error::{ExporterError, Result};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn failing_broker(message: &'static str) -> impl Fn(&str) -> Result<String> {
    move |_: &str| -> Result<String> { panic!("{message}") }
}

#[tokio::test]
async fn test_valid_stored_credential_skips_interactive_flow() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let auth = auth_service(&dir, &server.uri());
    seed_credential(auth.store(), i64::MAX);

    auth.authenticate(&failing_broker("broker must not run for a valid credential"))
        .await
        .expect("stored credential should authenticate");
    assert_eq!(auth.access_token().await.as_deref(), Some("at-seed"));
}

#[tokio::test]
async fn test_expired_credential_with_refresh_token_is_authenticated() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let auth = auth_service(&dir, &server.uri());
    // Expired, but the refresh token lets the 401 path recover it later.
    seed_credential(auth.store(), 0);

    auth.authenticate(&failing_broker("broker must not run when a refresh token exists"))
        .await
        .expect("expired credential with refresh token should authenticate");
    assert_eq!(auth.access_token().await.as_deref(), Some("at-seed"));
}

#[tokio::test]
async fn test_interactive_flow_exchanges_code_with_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/as/token.oauth2"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=0123456789abcdef"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", "rt-1")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let auth = auth_service(&dir, &server.uri());

    let callback = format!(
        "https://localhost/callback?code=0123456789abcdef&state={}",
        auth.pkce().state
    );
    let broker = move |authorize_url: &str| -> Result<String> {
        assert!(authorize_url.contains("code_challenge_method=S256"));
        Ok(callback.clone())
    };

    auth.authenticate(&broker)
        .await
        .expect("interactive flow should succeed");

    let stored = auth.store().load().unwrap().expect("credential persisted");
    assert_eq!(stored.access_token, "at-1");
    assert_eq!(stored.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(auth.access_token().await.as_deref(), Some("at-1"));
}

#[tokio::test]
async fn test_callback_without_state_is_rejected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let auth = auth_service(&dir, &server.uri());

    let broker = |_: &str| -> Result<String> {
        Ok("https://localhost/callback?code=0123456789abcdef".to_string())
    };
    let err = auth.authenticate(&broker).await.unwrap_err();
    assert!(matches!(err, ExporterError::Auth(_)));
    assert!(!auth.store().exists());
}

#[tokio::test]
async fn test_callback_with_short_code_is_rejected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let auth = auth_service(&dir, &server.uri());

    let state = auth.pkce().state.clone();
    let broker = move |_: &str| -> Result<String> {
        Ok(format!("https://localhost/callback?code=abc&state={state}"))
    };
    let err = auth.authenticate(&broker).await.unwrap_err();
    assert!(matches!(err, ExporterError::Auth(_)));
}

#[tokio::test]
async fn test_token_exchange_failure_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/as/token.oauth2"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let auth = auth_service(&dir, &server.uri());

    let callback = format!(
        "https://localhost/callback?code=0123456789abcdef&state={}",
        auth.pkce().state
    );
    let broker = move |_: &str| -> Result<String> { Ok(callback.clone()) };

    let err = auth.authenticate(&broker).await.unwrap_err();
    assert!(matches!(err, ExporterError::Auth(_)));
    assert!(err.is_permanent());
}
