// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exporter error types.
//!
//! The split between `Refresh` and `RefreshRejected` matters: rejected
//! refreshes mean the stored credential is gone for good (the vendor refused
//! it and the file has been moved aside), while plain `Refresh` and `Network`
//! failures are transient and leave the stored credential untouched.

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("no stored credential")]
    NoCredential,

    /// Permanent refresh failure. The stored credential has been invalidated
    /// (or never contained a refresh token); retrying cannot succeed.
    #[error("token refresh rejected: {0}")]
    RefreshRejected(String),

    /// Transient refresh failure. The stored credential is still intact.
    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("endpoint {endpoint}: {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ExporterError {
    /// Build an endpoint-level failure (isolated per polling section).
    pub fn endpoint(endpoint: &str, reason: impl Into<String>) -> Self {
        Self::Endpoint {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this failure means the stored credential is unusable and
    /// retrying without re-authorization is pointless.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ExporterError::Auth(_)
                | ExporterError::NoCredential
                | ExporterError::RefreshRejected(_)
                | ExporterError::Config(_)
        )
    }
}

/// Result type alias for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;
