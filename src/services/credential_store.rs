// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable credential storage.
//!
//! The credential file is the sole durable state of the exporter. It is
//! overwritten in full on every refresh, and on unrecoverable corruption or
//! permanent auth failure it is renamed aside with a `.bak` suffix rather
//! than deleted, preserving forensic evidence.

use crate::error::{ExporterError, Result};
use crate::models::Credential;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk credential store. Single reader, single writer.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored credential.
    ///
    /// Missing file yields `Ok(None)`. Unparseable content is backed up
    /// aside and also yields `Ok(None)` so the caller falls back to
    /// interactive authorization.
    pub fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str::<Credential>(&text).map_err(Into::into));

        match parsed {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "credential file unreadable, backing it up"
                );
                self.invalidate();
                Ok(None)
            }
        }
    }

    /// Persist a credential, replacing the previous file in full.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let text = serde_json::to_string_pretty(credential)
            .context("failed to serialize credential")
            .map_err(ExporterError::Internal)?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))
            .map_err(ExporterError::Internal)?;
        tracing::info!("credential saved (new refresh token stored)");
        Ok(())
    }

    /// Move the credential file aside instead of deleting it.
    pub fn invalidate(&self) {
        if !self.path.exists() {
            return;
        }
        let backup = self.backup_path();
        match fs::rename(&self.path, &backup) {
            Ok(()) => tracing::warn!(backup = %backup.display(), "credential backed up"),
            Err(e) => tracing::error!(error = %e, "credential backup failed"),
        }
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenResponse;
    use serde_json::json;
    use tempfile::TempDir;

    fn credential() -> Credential {
        let response: TokenResponse = serde_json::from_value(json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "expires_in": 1800,
        }))
        .unwrap();
        Credential::from_token_response(response, 1_000_000)
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));

        store.save(&credential()).unwrap();
        let loaded = store.load().unwrap().expect("credential should load");

        assert_eq!(loaded.access_token, "at-1");
        assert_eq!(loaded.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(loaded.expires_at, 1_000_000 + 1800 - 60);
    }

    #[test]
    fn test_invalidate_renames_instead_of_deleting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        let store = CredentialStore::new(&path);

        store.save(&credential()).unwrap();
        store.invalidate();

        assert!(!path.exists());
        assert!(dir.path().join("token.json.bak").exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_backed_up_and_loads_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{ not json").unwrap();

        let store = CredentialStore::new(&path);
        assert!(store.load().unwrap().is_none());
        assert!(!path.exists());
        assert!(dir.path().join("token.json.bak").exists());
    }
}
