// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

pub mod auth;
pub mod credential_store;
pub mod geocode;
pub mod http;
pub mod pkce;
pub mod poller;
pub mod volvo;
pub mod weather;

pub use auth::{AuthService, AuthorizationBroker};
pub use credential_store::CredentialStore;
pub use geocode::GeocodeService;
pub use http::InstrumentedClient;
pub use pkce::PkceContext;
pub use poller::Poller;
pub use volvo::VolvoClient;
pub use weather::{WeatherReading, WeatherService};
