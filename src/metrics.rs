// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prometheus metric registry with on-demand series materialization.
//!
//! The vehicle API's statistics and energy endpoints return field sets that
//! are not known at compile time, so gauge families are created lazily the
//! first time a derived series name is seen and reused on every later
//! encounter. Label values vary per sample; the label *key* set of a series
//! is fixed by its call site.
//!
//! Request instrumentation (counter + duration histogram) uses typed label
//! sets and is registered eagerly at construction.

use prometheus_client::encoding::text;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Mutex, RwLock};

/// Labels for the outbound request counter and duration histogram.
///
/// `endpoint` is the sanitized URL (no query, identifying path segments
/// replaced) to keep cardinality bounded.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub endpoint: String,
    pub status_code: String,
}

/// Floating-point gauge.
pub type GaugeValue = Gauge<f64, AtomicU64>;

/// Dynamic label pairs. The key set must be identical for every sample of a
/// given series.
pub type LabelPairs = Vec<(String, String)>;

type GaugeFamily = Family<LabelPairs, GaugeValue>;

/// Outbound request duration buckets in seconds.
const DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Process-wide metric set: one shared registry plus the dynamic gauge map.
///
/// Created once at startup, mutated only by the polling pipeline and the
/// instrumented HTTP client.
pub struct MetricSet {
    registry: RwLock<Registry>,
    gauges: Mutex<HashMap<String, GaugeFamily>>,
    http_requests: Family<HttpLabels, Counter>,
    http_request_duration_seconds: Family<HttpLabels, Histogram>,
}

impl MetricSet {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests = Family::<HttpLabels, Counter>::default();
        // Encoded as `http_requests_total` (the counter suffix is appended
        // by the exposition format).
        registry.register(
            "http_requests",
            "Total HTTP requests made",
            http_requests.clone(),
        );

        let http_request_duration_seconds =
            Family::<HttpLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(DURATION_BUCKETS.iter().copied())
            });
        registry.register(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_request_duration_seconds.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            gauges: Mutex::new(HashMap::new()),
            http_requests,
            http_request_duration_seconds,
        }
    }

    /// Get or create the gauge family for `name`.
    ///
    /// A series name is registered at most once; a second call with the same
    /// name returns the existing handle and never touches the registry.
    pub fn gauge(&self, name: &str, help: &str) -> GaugeFamily {
        let mut gauges = self.gauges.lock().expect("metrics gauge map poisoned");
        if let Some(family) = gauges.get(name) {
            return family.clone();
        }

        let family = GaugeFamily::default();
        self.registry
            .write()
            .expect("metrics registry poisoned")
            .register(name.to_string(), help, family.clone());
        gauges.insert(name.to_string(), family.clone());
        tracing::debug!(metric = name, "created metric series");
        family
    }

    /// Set a gauge sample, materializing the series on first encounter.
    pub fn set_gauge(&self, name: &str, help: &str, labels: LabelPairs, value: f64) {
        self.gauge(name, help).get_or_create(&labels).set(value);
    }

    /// Number of distinct gauge series names created so far.
    pub fn series_count(&self) -> usize {
        self.gauges.lock().expect("metrics gauge map poisoned").len()
    }

    /// Record one outbound HTTP request.
    pub fn observe_request(&self, method: &str, endpoint: &str, status_code: &str, seconds: f64) {
        let labels = HttpLabels {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            status_code: status_code.to_string(),
        };
        self.http_requests.get_or_create(&labels).inc();
        self.http_request_duration_seconds
            .get_or_create(&labels)
            .observe(seconds);
    }

    /// Encode the full registry in OpenMetrics text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        text::encode(
            &mut buffer,
            &self.registry.read().expect("metrics registry poisoned"),
        )?;
        Ok(buffer)
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::new()
    }
}
