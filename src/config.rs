// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! All settings are read once at startup. The OAuth client credentials and
//! the Vcc API key are required; the geocoding and weather keys are optional
//! and disable their enrichment lookups when absent.

use std::env;
use std::path::PathBuf;

/// Default OAuth scopes requested during interactive authorization.
const DEFAULT_SCOPE: &str = "openid conve:vehicle_relation conve:battery_charge_level \
     conve:odometer_status conve:engine_status conve:warnings conve:tyre_status \
     conve:diagnostics_workshop energy:state:read location:read";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Volvo ID OAuth client ID
    pub client_id: String,
    /// Volvo ID OAuth client secret
    pub client_secret: String,
    /// Vcc-Api-Key sent on every vehicle API request
    pub api_key: String,
    /// Redirect URI registered for the OAuth application
    pub redirect_uri: String,
    /// Requested OAuth scopes
    pub scope: String,
    /// Geoapify reverse-geocoding key (optional)
    pub geoapify_api_key: Option<String>,
    /// OpenWeatherMap key (optional)
    pub weather_api_key: Option<String>,
    /// Seconds between polling rounds
    pub poll_interval_secs: u64,
    /// Metrics listener bind address
    pub listen_addr: String,
    /// Metrics listener port
    pub listen_port: u16,
    /// Path of the persisted credential file
    pub token_file: PathBuf,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            client_secret: "test_client_secret".to_string(),
            api_key: "test_api_key".to_string(),
            redirect_uri: "https://localhost/callback".to_string(),
            scope: "openid".to_string(),
            geoapify_api_key: None,
            weather_api_key: None,
            poll_interval_secs: 60,
            listen_addr: "127.0.0.1".to_string(),
            listen_port: 9101,
            token_file: PathBuf::from("volvo_token.json"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            client_id: env::var("VOLVO_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("VOLVO_CLIENT_ID"))?,
            client_secret: env::var("VOLVO_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("VOLVO_CLIENT_SECRET"))?,
            api_key: env::var("VOLVO_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("VOLVO_API_KEY"))?,
            redirect_uri: env::var("VOLVO_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("VOLVO_REDIRECT_URI"))?,
            scope: env::var("VOLVO_SCOPE").unwrap_or_else(|_| DEFAULT_SCOPE.to_string()),
            geoapify_api_key: env::var("GEOAPIFY_API_KEY").ok(),
            weather_api_key: env::var("WEATHER_API_KEY").ok(),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("POLL_INTERVAL_SECS"))?,
            listen_addr: env::var("EXPORTER_LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            listen_port: env::var("EXPORTER_LISTEN_PORT")
                .unwrap_or_else(|_| "9101".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("EXPORTER_LISTEN_PORT"))?,
            token_file: env::var("VOLVO_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("volvo_token.json")),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Malformed environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test because the cases share process-wide environment state.
    #[test]
    fn test_config_from_env() {
        env::set_var("VOLVO_CLIENT_ID", "test_id");
        env::set_var("VOLVO_CLIENT_SECRET", "test_secret");
        env::set_var("VOLVO_REDIRECT_URI", "https://localhost/cb");
        env::remove_var("VOLVO_API_KEY");
        env::remove_var("POLL_INTERVAL_SECS");

        let err = Config::from_env().expect_err("missing API key should fail");
        assert!(matches!(err, ConfigError::Missing("VOLVO_API_KEY")));

        env::set_var("VOLVO_API_KEY", "test_key");
        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.client_id, "test_id");
        assert_eq!(config.api_key, "test_key");
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.listen_port, 9101);
    }
}
