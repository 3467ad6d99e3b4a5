// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Volvo connected-vehicle API client.
//!
//! Thin per-endpoint request builder bound to a single VIN. On a 401 it
//! delegates to the auth service for exactly one refresh-and-retry cycle;
//! every other failure degrades to an empty result so one endpoint can never
//! abort a polling round.

use crate::error::ExporterError;
use crate::models::VehicleListResponse;
use crate::services::auth::AuthService;
use crate::services::http::InstrumentedClient;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.volvocars.com";

/// Refresh retry policy used on 401 responses.
const REFRESH_MAX_ATTEMPTS: u32 = 2;
const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Vehicle API client for a single selected VIN.
pub struct VolvoClient {
    http: InstrumentedClient,
    auth: Arc<AuthService>,
    api_key: String,
    base_url: String,
    /// Selected once after listing vehicles, immutable afterwards.
    vin: OnceLock<String>,
}

impl VolvoClient {
    pub fn new(auth: Arc<AuthService>, http: InstrumentedClient, api_key: String) -> Self {
        Self {
            http,
            auth,
            api_key,
            base_url: DEFAULT_API_BASE.to_string(),
            vin: OnceLock::new(),
        }
    }

    /// Override the API base URL (tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Select the vehicle all subsequent endpoint URLs are built for.
    pub fn select_vin(&self, vin: String) {
        if self.vin.set(vin).is_err() {
            tracing::warn!("VIN already selected, ignoring reselection");
        }
    }

    pub fn vin(&self) -> Option<&str> {
        self.vin.get().map(String::as_str)
    }

    /// List VINs available to the authenticated account.
    ///
    /// Any failure yields an empty list (soft: callers treat an empty fleet
    /// as "try again later"); an empty fleet at startup is the caller's
    /// fatal condition, not an error type here.
    pub async fn list_vehicles(&self) -> Vec<String> {
        let url = format!("{}/connected-vehicle/v2/vehicles", self.base_url);
        let response = match self.request("vehicles", &url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "vehicle list request failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "vehicle list failed");
            return Vec::new();
        }

        match response.json::<VehicleListResponse>().await {
            Ok(list) => {
                let vins: Vec<String> = list.data.into_iter().map(|v| v.vin).collect();
                tracing::info!(count = vins.len(), "vehicles discovered");
                vins
            }
            Err(e) => {
                tracing::error!(error = %e, "vehicle list parse failed");
                Vec::new()
            }
        }
    }

    /// Fetch one per-vehicle endpoint, returning its payload with the
    /// conventional `{"data": ...}` envelope unwrapped.
    ///
    /// Soft failures (no VIN selected, non-200 status, malformed body) all
    /// return an empty object; the polling round decides what "absent" means.
    pub async fn vehicle_data(&self, endpoint: &str) -> Value {
        if self.vin().is_none() {
            tracing::error!(endpoint, "no VIN selected");
            return empty_object();
        }

        let url = self.endpoint_url(endpoint);
        let response = match self.request(endpoint, &url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(endpoint, error = %e, "endpoint request failed");
                return empty_object();
            }
        };

        if !response.status().is_success() {
            tracing::debug!(endpoint, status = %response.status(), "endpoint returned non-success");
            return empty_object();
        }

        match response.json::<Value>().await {
            Ok(mut body) => {
                tracing::debug!(endpoint, "endpoint ok");
                match body.get_mut("data") {
                    Some(data) => data.take(),
                    None => body,
                }
            }
            Err(e) => {
                tracing::debug!(endpoint, error = %e, "endpoint body parse failed");
                empty_object()
            }
        }
    }

    /// Resolve a logical endpoint key to a concrete URL.
    ///
    /// Unknown keys fall back to the generic per-vehicle sub-path so new
    /// vendor endpoints are reachable without a routing-table update.
    fn endpoint_url(&self, endpoint: &str) -> String {
        let base = &self.base_url;
        let vin = self.vin().unwrap_or_default();
        match endpoint {
            "vehicles" => format!("{base}/connected-vehicle/v2/vehicles"),
            "status" => format!("{base}/connected-vehicle/v2/vehicles/{vin}"),
            "statistics" => format!("{base}/connected-vehicle/v2/vehicles/{vin}/statistics"),
            "energy" => format!("{base}/energy/v2/vehicles/{vin}/state"),
            "odometer" => format!("{base}/connected-vehicle/v2/vehicles/{vin}/odometer"),
            "engine-status" => format!("{base}/connected-vehicle/v2/vehicles/{vin}/engine-status"),
            "warnings" => format!("{base}/connected-vehicle/v2/vehicles/{vin}/warnings"),
            "tyres" => format!("{base}/connected-vehicle/v2/vehicles/{vin}/tyres"),
            "diagnostics" => format!("{base}/connected-vehicle/v2/vehicles/{vin}/diagnostics"),
            "location" => format!("{base}/location/v1/vehicles/{vin}/location"),
            other => format!("{base}/connected-vehicle/v2/vehicles/{vin}/{other}"),
        }
    }

    /// Issue a GET with auth headers; on 401, perform exactly one
    /// refresh-and-retry cycle. A second 401 after the retry is returned
    /// as-is (a final failure for this request, never a second refresh).
    async fn request(
        &self,
        endpoint: &str,
        url: &str,
    ) -> Result<reqwest::Response, ExporterError> {
        let response = self.http.get(url, &self.headers(endpoint).await).await?;
        if response.status().as_u16() != 401 {
            return Ok(response);
        }

        tracing::warn!(endpoint, "401 response, attempting token refresh");
        if !self
            .auth
            .refresh_with_backoff(REFRESH_MAX_ATTEMPTS, REFRESH_RETRY_DELAY)
            .await
        {
            return Ok(response);
        }

        let retried = self.http.get(url, &self.headers(endpoint).await).await?;
        tracing::warn!(endpoint, status = %retried.status(), "request retried after refresh");
        Ok(retried)
    }

    async fn headers(&self, endpoint: &str) -> Vec<(&'static str, String)> {
        let operation_id = if endpoint == "vehicles" {
            "exporter-list-vehicles".to_string()
        } else {
            format!("exporter-poll-{endpoint}")
        };
        vec![
            ("Vcc-Api-Key", self.api_key.clone()),
            ("Accept", "application/json;q=0.9,text/plain".to_string()),
            ("vcc-api-operationId", operation_id),
            (
                "Authorization",
                format!("Bearer {}", self.auth.access_token().await.unwrap_or_default()),
            ),
        ]
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
