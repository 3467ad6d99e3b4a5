// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers for the metrics endpoint and health check.

use crate::metrics::MetricSet;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// OpenMetrics exposition content type.
const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Encode the current metric registry in OpenMetrics text format.
async fn scrape_metrics(State(metrics): State<Arc<MetricSet>>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "metric encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build the complete router with all routes.
pub fn create_router(metrics: Arc<MetricSet>) -> Router {
    Router::new()
        .route("/metrics", get(scrape_metrics))
        .route("/healthz", get(health_check))
        .with_state(metrics)
}
