// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use volvo_exporter::config::Config;
use volvo_exporter::metrics::MetricSet;
use volvo_exporter::models::Credential;
use volvo_exporter::services::{AuthService, CredentialStore, InstrumentedClient, VolvoClient};

/// Config pointing the credential file into a temp directory.
#[allow(dead_code)]
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.token_file = dir.path().join("token.json");
    config
}

/// Auth service wired to a mock identity provider.
#[allow(dead_code)]
pub fn auth_service(dir: &TempDir, server_uri: &str) -> AuthService {
    let metrics = Arc::new(MetricSet::new());
    AuthService::new(&test_config(dir), InstrumentedClient::new(metrics)).with_endpoints(
        format!("{server_uri}/as/authorization.oauth2"),
        format!("{server_uri}/as/token.oauth2"),
    )
}

/// Auth + vehicle client pair against the same mock server, sharing one
/// metric set.
#[allow(dead_code)]
pub fn vehicle_client(dir: &TempDir, server_uri: &str) -> (Arc<AuthService>, Arc<VolvoClient>) {
    let metrics = Arc::new(MetricSet::new());
    let http = InstrumentedClient::new(metrics);
    let auth = Arc::new(
        AuthService::new(&test_config(dir), http.clone()).with_endpoints(
            format!("{server_uri}/as/authorization.oauth2"),
            format!("{server_uri}/as/token.oauth2"),
        ),
    );
    let api = Arc::new(
        VolvoClient::new(auth.clone(), http, "test_api_key".to_string())
            .with_base_url(server_uri.to_string()),
    );
    (auth, api)
}

/// Store a credential with the given absolute expiry.
#[allow(dead_code)]
pub fn seed_credential(store: &CredentialStore, expires_at: i64) {
    let credential = Credential {
        access_token: "at-seed".to_string(),
        refresh_token: Some("rt-seed".to_string()),
        expires_in: Some(1800),
        expires_at,
        extra: serde_json::Map::new(),
    };
    store.save(&credential).expect("seed credential");
}

/// A well-formed token endpoint response body.
#[allow(dead_code)]
pub fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 1800,
        "token_type": "Bearer",
    })
}
