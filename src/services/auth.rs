// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential lifecycle manager for the Volvo ID OAuth2 PKCE flow.
//!
//! Handles:
//! - Interactive authorization-code + PKCE exchange
//! - Credential persistence with expiry tracking
//! - Refresh with bounded retry and failure classification
//! - Invalidation (rename aside) on permanent auth failures
//!
//! Failure classification on refresh:
//! - HTTP 400/401 → permanent, stored credential moved aside
//! - other non-200 or transport failure → transient, credential untouched
//! - 200 with an unparseable body → transient (the vendor's response shape
//!   may have temporarily changed)
//! - 200 parseable but missing a required field → permanent (the contract
//!   itself changed)

use crate::config::Config;
use crate::error::{ExporterError, Result};
use crate::models::{Credential, TokenResponse};
use crate::services::credential_store::CredentialStore;
use crate::services::http::InstrumentedClient;
use crate::services::pkce::PkceContext;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use url::Url;

const DEFAULT_AUTH_URL: &str = "https://volvoid.eu.volvocars.com/as/authorization.oauth2";
const DEFAULT_TOKEN_URL: &str = "https://volvoid.eu.volvocars.com/as/token.oauth2";

/// Minimum plausible length of an authorization code in a callback URL.
const MIN_CODE_LEN: usize = 10;

/// Supplies the callback URL for interactive authorization.
///
/// Injected so the lifecycle manager has no direct dependency on interactive
/// input; tests provide synthetic callback URLs, the binary reads stdin.
pub trait AuthorizationBroker {
    fn obtain_callback_url(&self, authorize_url: &str) -> Result<String>;
}

impl<F> AuthorizationBroker for F
where
    F: Fn(&str) -> Result<String>,
{
    fn obtain_callback_url(&self, authorize_url: &str) -> Result<String> {
        self(authorize_url)
    }
}

/// Owns the PKCE context, the stored credential and the refresh state
/// machine. At most one refresh is in flight at a time.
pub struct AuthService {
    http: InstrumentedClient,
    store: CredentialStore,
    pkce: PkceContext,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
    auth_url: String,
    token_url: String,
    /// In-memory copy of the stored credential, kept in sync with the store.
    current: RwLock<Option<Credential>>,
    /// Serializes refresh attempts: a second concurrent refresh would
    /// invalidate the first's new refresh token before it could be used.
    refresh_lock: Mutex<()>,
}

impl AuthService {
    pub fn new(config: &Config, http: InstrumentedClient) -> Self {
        Self {
            http,
            store: CredentialStore::new(config.token_file.clone()),
            pkce: PkceContext::generate(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Override the identity-provider endpoints (tests).
    pub fn with_endpoints(mut self, auth_url: String, token_url: String) -> Self {
        self.auth_url = auth_url;
        self.token_url = token_url;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn pkce(&self) -> &PkceContext {
        &self.pkce
    }

    /// Current bearer token, if any.
    pub async fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    /// Establish an authenticated state.
    ///
    /// A stored, unexpired credential short-circuits the interactive flow.
    /// A stored but expired credential with a refresh token also counts as
    /// authenticated: the refresh path recovers it on the first 401 rather
    /// than re-running interactive authorization.
    pub async fn authenticate(&self, broker: &dyn AuthorizationBroker) -> Result<()> {
        if let Some(credential) = self.store.load()? {
            let now = Utc::now().timestamp();
            if credential.is_valid(now) {
                tracing::info!("stored credential loaded");
                *self.current.write().await = Some(credential);
                return Ok(());
            }
            if credential.refresh_token.is_some() {
                tracing::warn!("stored credential expired, refresh token available");
                *self.current.write().await = Some(credential);
                return Ok(());
            }
            // Expired without refresh token: fall through to interactive.
        }

        let authorize_url = self.authorization_url();
        let callback_url = broker.obtain_callback_url(&authorize_url)?;

        if !callback_url.contains(&self.pkce.state) {
            return Err(ExporterError::Auth(
                "state token missing from callback URL".to_string(),
            ));
        }
        let code = extract_code(&callback_url)?;

        tracing::info!("exchanging authorization code");
        let response = self
            .http
            .post_form(
                &self.token_url,
                &[
                    ("grant_type", "authorization_code"),
                    ("client_id", &self.client_id),
                    ("client_secret", &self.client_secret),
                    ("code", &code),
                    ("redirect_uri", &self.redirect_uri),
                    ("code_verifier", &self.pkce.verifier),
                ],
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExporterError::Auth(format!(
                "token exchange failed with status {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ExporterError::Auth(format!("token response parse error: {e}")))?;
        self.persist(token).await?;
        tracing::info!("PKCE authorization complete");
        Ok(())
    }

    /// Build the authorization URL embedding the PKCE challenge and state.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}?response_type=code&client_id={}&scope={}&redirect_uri={}&state={}&code_challenge={}&code_challenge_method=S256",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.scope),
            urlencoding::encode(&self.redirect_uri),
            self.pkce.state,
            self.pkce.challenge,
        )
    }

    /// Single refresh attempt, no retry.
    pub async fn refresh_once(&self) -> Result<()> {
        let credential = self.store.load()?.ok_or(ExporterError::NoCredential)?;
        let refresh_token = credential.refresh_token.clone().ok_or_else(|| {
            ExporterError::RefreshRejected("stored credential has no refresh token".to_string())
        })?;

        tracing::info!("refreshing access token");
        let response = self
            .http
            .post_form(
                &self.token_url,
                &[
                    ("grant_type", "refresh_token"),
                    ("client_id", &self.client_id),
                    ("client_secret", &self.client_secret),
                    ("refresh_token", &refresh_token),
                ],
            )
            .await?;

        let status = response.status().as_u16();
        match status {
            200 => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| ExporterError::Network(e.to_string()))?;

                let value: serde_json::Value = match serde_json::from_str(&body) {
                    Ok(v) => v,
                    Err(e) => {
                        // Unparseable 200 body: the response shape may have
                        // temporarily changed, keep the stored credential.
                        return Err(ExporterError::Refresh(format!(
                            "unparseable token response: {e}"
                        )));
                    }
                };
                let token: TokenResponse = match serde_json::from_value(value) {
                    Ok(t) => t,
                    Err(e) => {
                        // Parseable but missing a required field: the
                        // contract changed, the stored credential is void.
                        self.discard_credential().await;
                        return Err(ExporterError::RefreshRejected(format!(
                            "token response missing required field: {e}"
                        )));
                    }
                };

                self.persist(token).await?;
                tracing::info!("access token refreshed");
                Ok(())
            }
            400 | 401 => {
                tracing::error!(status, "refresh rejected, invalidating credential");
                self.discard_credential().await;
                Err(ExporterError::RefreshRejected(format!(
                    "refresh rejected with status {status}"
                )))
            }
            _ => Err(ExporterError::Refresh(format!(
                "refresh failed with status {status}"
            ))),
        }
    }

    /// Bounded-retry refresh: up to `max_attempts` calls to `refresh_once`
    /// with `delay` between attempts. Stops early on a permanent failure,
    /// since the credential file has already been moved aside and further
    /// attempts cannot succeed.
    pub async fn refresh_with_backoff(&self, max_attempts: u32, delay: Duration) -> bool {
        let _guard = self.refresh_lock.lock().await;

        for attempt in 1..=max_attempts {
            match self.refresh_once().await {
                Ok(()) => return true,
                Err(e) if e.is_permanent() => {
                    tracing::error!(error = %e, "refresh failed permanently");
                    return false;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "refresh attempt failed"
                    );
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }
        false
    }

    async fn persist(&self, token: TokenResponse) -> Result<()> {
        let credential = Credential::from_token_response(token, Utc::now().timestamp());
        self.store.save(&credential)?;
        *self.current.write().await = Some(credential);
        Ok(())
    }

    async fn discard_credential(&self) {
        self.store.invalidate();
        *self.current.write().await = None;
    }
}

/// Extract and validate the authorization code from a callback URL.
fn extract_code(callback_url: &str) -> Result<String> {
    let parsed = Url::parse(callback_url)
        .map_err(|e| ExporterError::Auth(format!("invalid callback URL: {e}")))?;

    let code = parsed
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| ExporterError::Auth("callback URL missing authorization code".to_string()))?;

    if code.len() < MIN_CODE_LEN {
        return Err(ExporterError::Auth(
            "authorization code too short".to_string(),
        ));
    }
    Ok(code)
}
