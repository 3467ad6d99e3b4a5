// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reverse geocoding with a per-VIN address cache.
//!
//! Addresses feed a metric label, so their churn must be bounded: the cache
//! entry is only overwritten when a newly resolved address actually differs,
//! preventing the label from oscillating between equivalent representations.
//! The cache is never evicted; it is bounded by the number of distinct
//! vehicles, which is small and fixed.

use crate::services::http::InstrumentedClient;
use dashmap::DashMap;
use serde_json::Value;

const DEFAULT_GEOAPIFY_BASE: &str = "https://api.geoapify.com";

/// Address used before the first successful resolution.
const UNKNOWN_ADDRESS: &str = "unknown";

/// Reverse-geocoding service. Lookups are skipped entirely when no API key
/// is configured.
pub struct GeocodeService {
    http: InstrumentedClient,
    api_key: Option<String>,
    base_url: String,
    cache: DashMap<String, String>,
}

impl GeocodeService {
    pub fn new(http: InstrumentedClient, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: DEFAULT_GEOAPIFY_BASE.to_string(),
            cache: DashMap::new(),
        }
    }

    /// Override the Geoapify base URL (tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Last known address for a VIN, if one was ever resolved.
    pub fn cached(&self, vin: &str) -> Option<String> {
        self.cache.get(vin).map(|entry| entry.clone())
    }

    /// Resolve the address for the given coordinates.
    ///
    /// Returns the cached address when no key is configured or the lookup
    /// fails; overwrites the cache only when the resolved address differs
    /// from the cached one.
    pub async fn resolve(&self, vin: &str, lat: f64, lon: f64) -> String {
        let current = self
            .cached(vin)
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string());

        let Some(api_key) = &self.api_key else {
            return current;
        };

        let url = format!(
            "{}/v1/geocode/reverse?lat={lat}&lon={lon}&apiKey={api_key}",
            self.base_url
        );
        let response = match self.http.get(&url, &[]).await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!(status = %response.status(), "reverse geocode failed");
                return current;
            }
            Err(e) => {
                tracing::debug!(error = %e, "reverse geocode request failed");
                return current;
            }
        };

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, "reverse geocode parse failed");
                return current;
            }
        };

        let resolved = body
            .get("features")
            .and_then(|f| f.get(0))
            .and_then(|feature| feature.get("properties"))
            .and_then(|props| props.get("formatted"))
            .and_then(Value::as_str);

        match resolved {
            Some(address) if address != current => {
                tracing::info!(vin, address, "address updated");
                self.cache.insert(vin.to_string(), address.to_string());
                address.to_string()
            }
            _ => current,
        }
    }
}
