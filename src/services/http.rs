// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Instrumented HTTP transport.
//!
//! Every outbound request in the exporter goes through [`InstrumentedClient`]
//! so the request counter and duration histogram see all traffic, with URLs
//! sanitized before being used as label values.

use crate::error::ExporterError;
use crate::metrics::MetricSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Fixed timeout for every outbound request; a hung remote end degrades to a
/// per-endpoint failure instead of stalling the polling loop.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `reqwest::Client` wrapper recording request metrics.
#[derive(Clone)]
pub struct InstrumentedClient {
    http: reqwest::Client,
    metrics: Arc<MetricSet>,
}

impl InstrumentedClient {
    pub fn new(metrics: Arc<MetricSet>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to construct HTTP client"),
            metrics,
        }
    }

    /// GET with extra headers.
    pub async fn get(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
    ) -> Result<reqwest::Response, ExporterError> {
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        self.execute("GET", url, request).await
    }

    /// Form-encoded POST (token endpoint shape).
    pub async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, ExporterError> {
        let request = self.http.post(url).form(params);
        self.execute("POST", url, request).await
    }

    async fn execute(
        &self,
        method: &str,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ExporterError> {
        let start = Instant::now();
        let result = request.send().await;
        let elapsed = start.elapsed().as_secs_f64();

        let status_code = match &result {
            Ok(response) => response.status().as_u16().to_string(),
            Err(_) => "error".to_string(),
        };
        let endpoint = sanitize_endpoint(url);
        self.metrics
            .observe_request(method, &endpoint, &status_code, elapsed);
        tracing::debug!(
            method,
            endpoint = %endpoint,
            status = %status_code,
            elapsed_secs = elapsed,
            "outbound request"
        );

        result.map_err(|e| ExporterError::Network(e.to_string()))
    }
}

/// Sanitize a URL for use as a metric label.
///
/// Drops query parameters (which carry API keys and coordinates) and replaces
/// identifying path segments: VINs with `<VIN>`, UUIDs with `<UUID>`, long
/// hex or numeric ids with `<ID>`.
pub fn sanitize_endpoint(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let path: Vec<&str> = parsed
        .path()
        .split('/')
        .map(|segment| {
            if is_vin(segment) {
                "<VIN>"
            } else if is_uuid(segment) {
                "<UUID>"
            } else if is_opaque_id(segment) {
                "<ID>"
            } else {
                segment
            }
        })
        .collect();

    let host = parsed.host_str().unwrap_or_default();
    match parsed.port() {
        Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, path.join("/")),
        None => format!("{}://{}{}", parsed.scheme(), host, path.join("/")),
    }
}

/// 17 characters from the VIN alphabet (uppercase alphanumeric minus I/O/Q).
fn is_vin(segment: &str) -> bool {
    segment.len() == 17
        && segment
            .chars()
            .all(|c| c.is_ascii_digit() || (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q')))
}

fn is_uuid(segment: &str) -> bool {
    segment.len() == 36
        && segment.chars().enumerate().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// Long hex blobs or numeric ids that would explode label cardinality.
fn is_opaque_id(segment: &str) -> bool {
    (segment.len() >= 24 && segment.chars().all(|c| c.is_ascii_hexdigit()))
        || (segment.len() >= 5 && segment.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_vin() {
        let url = "https://api.volvocars.com/connected-vehicle/v2/vehicles/YV1AB12C4D1234567/odometer";
        assert_eq!(
            sanitize_endpoint(url),
            "https://api.volvocars.com/connected-vehicle/v2/vehicles/<VIN>/odometer"
        );
    }

    #[test]
    fn test_sanitize_strips_query_parameters() {
        let url = "https://api.geoapify.com/v1/geocode/reverse?lat=1.0&lon=2.0&apiKey=secret";
        assert_eq!(
            sanitize_endpoint(url),
            "https://api.geoapify.com/v1/geocode/reverse"
        );
    }

    #[test]
    fn test_sanitize_replaces_uuid_and_numeric_id() {
        assert_eq!(
            sanitize_endpoint("https://x.example/a/123e4567-e89b-12d3-a456-426614174000/b"),
            "https://x.example/a/<UUID>/b"
        );
        assert_eq!(
            sanitize_endpoint("https://x.example/a/1234567/b"),
            "https://x.example/a/<ID>/b"
        );
    }

    #[test]
    fn test_sanitize_keeps_ordinary_segments() {
        assert_eq!(
            sanitize_endpoint("https://api.volvocars.com/connected-vehicle/v2/vehicles"),
            "https://api.volvocars.com/connected-vehicle/v2/vehicles"
        );
    }

    #[test]
    fn test_sanitize_preserves_port() {
        assert_eq!(
            sanitize_endpoint("http://127.0.0.1:9101/metrics"),
            "http://127.0.0.1:9101/metrics"
        );
    }

    #[test]
    fn test_vin_alphabet_excludes_ioq() {
        assert!(is_vin("YV1AB12C4D1234567"));
        assert!(!is_vin("YV1AB12C4D123456I"));
        assert!(!is_vin("short"));
    }
}
