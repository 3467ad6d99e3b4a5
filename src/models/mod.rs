// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the exporter.

pub mod credential;
pub mod vehicle;

pub use credential::{Credential, TokenResponse, EXPIRY_MARGIN_SECS};
pub use vehicle::{VehicleLabels, VehicleListResponse, VehicleSummary};
