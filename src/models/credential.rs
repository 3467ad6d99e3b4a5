// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persisted OAuth credential and the vendor token-endpoint response.

use serde::{Deserialize, Serialize};

/// Safety margin subtracted from the vendor-declared token lifetime.
///
/// `expires_at` is always computed as issuance time + `expires_in` minus this
/// margin, so a token we consider valid is never one the vendor would reject
/// as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Token endpoint response (authorization-code exchange or refresh).
///
/// `refresh_token` is required: the vendor rotates it on every refresh and a
/// refresh response without one means the contract changed.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unknown vendor fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Durable credential record, overwritten in full on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Vendor-supplied lifetime, kept for reference; `expires_at` is what
    /// validity checks use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Computed absolute expiry (unix seconds).
    pub expires_at: i64,
    /// Unknown vendor fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Credential {
    /// Build a credential from a token response issued at `now` (unix secs).
    pub fn from_token_response(response: TokenResponse, now: i64) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: Some(response.refresh_token),
            expires_in: Some(response.expires_in),
            expires_at: now + response.expires_in - EXPIRY_MARGIN_SECS,
            extra: response.extra,
        }
    }

    /// A credential is usable iff the current time is strictly before
    /// `expires_at`.
    pub fn is_valid(&self, now: i64) -> bool {
        now < self.expires_at
    }
}
