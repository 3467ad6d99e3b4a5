// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Volvo-Exporter: Prometheus metrics for a Volvo connected vehicle
//!
//! This crate authenticates against the Volvo ID identity provider with the
//! OAuth2 authorization-code + PKCE flow, polls the connected-vehicle API on
//! an interval and exposes the results as an OpenMetrics scrape endpoint.

pub mod coerce;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod services;
