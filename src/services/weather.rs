// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort weather lookup keyed by the vehicle's coordinates.

use crate::coerce::as_f64;
use crate::services::http::InstrumentedClient;
use serde_json::Value;

const DEFAULT_WEATHER_BASE: &str = "https://api.openweathermap.org";

/// Weather observation at the vehicle's position (metric units).
#[derive(Debug, Clone, Copy)]
pub struct WeatherReading {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
}

/// OpenWeatherMap client. `fetch` is best-effort: any failure yields `None`
/// and must never affect the location metrics already set.
pub struct WeatherService {
    http: InstrumentedClient,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherService {
    pub fn new(http: InstrumentedClient, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: DEFAULT_WEATHER_BASE.to_string(),
        }
    }

    /// Override the OpenWeatherMap base URL (tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn fetch(&self, lat: f64, lon: f64) -> Option<WeatherReading> {
        let api_key = self.api_key.as_ref()?;
        let url = format!(
            "{}/data/2.5/weather?lat={lat}&lon={lon}&units=metric&appid={api_key}",
            self.base_url
        );

        let response = match self.http.get(&url, &[]).await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!(status = %response.status(), "weather lookup failed");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "weather request failed");
                return None;
            }
        };

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, "weather parse failed");
                return None;
            }
        };

        let main = body.get("main")?;
        Some(WeatherReading {
            temp: as_f64(main.get("temp")),
            feels_like: as_f64(main.get("feels_like")),
            temp_min: as_f64(main.get("temp_min")),
            temp_max: as_f64(main.get("temp_max")),
            pressure: as_f64(main.get("pressure")),
            humidity: as_f64(main.get("humidity")),
        })
    }
}
