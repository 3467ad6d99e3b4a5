// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Volvo-Exporter
//!
//! Authenticates against Volvo ID, polls the connected-vehicle API and
//! serves the results as Prometheus/OpenMetrics gauges.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use volvo_exporter::{
    config::Config,
    error::{ExporterError, Result},
    metrics::MetricSet,
    models::VehicleLabels,
    services::{
        AuthService, AuthorizationBroker, GeocodeService, InstrumentedClient, Poller, VolvoClient,
        WeatherService,
    },
};

/// Interactive broker: prints the authorization URL and reads the callback
/// URL from stdin after the user completes the browser flow.
struct StdinBroker;

impl AuthorizationBroker for StdinBroker {
    fn obtain_callback_url(&self, authorize_url: &str) -> Result<String> {
        println!("Open the following URL in a browser and authorize access:");
        println!("\n  {authorize_url}\n");
        print!("Paste the full callback URL here: ");
        std::io::stdout()
            .flush()
            .map_err(|e| ExporterError::Auth(format!("stdout flush failed: {e}")))?;

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| ExporterError::Auth(format!("stdin read failed: {e}")))?;
        Ok(line.trim().to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.listen_port,
        interval = config.poll_interval_secs,
        "Starting Volvo-Exporter"
    );

    let metrics = Arc::new(MetricSet::new());
    let http = InstrumentedClient::new(metrics.clone());

    // Authentication is fatal at startup: without a credential there is
    // nothing to poll.
    let auth = Arc::new(AuthService::new(&config, http.clone()));
    auth.authenticate(&StdinBroker).await?;

    let api = Arc::new(VolvoClient::new(
        auth.clone(),
        http.clone(),
        config.api_key.clone(),
    ));

    let vins = api.list_vehicles().await;
    let Some(vin) = vins.first() else {
        anyhow::bail!("no vehicles available on this account");
    };
    if vins.len() > 1 {
        tracing::warn!(count = vins.len(), "multiple vehicles found, using first");
    }
    api.select_vin(vin.clone());
    tracing::info!(vin = %vin, "vehicle selected");

    // Static descriptive labels are read once; they do not change between
    // polling rounds.
    let status = api.vehicle_data("status").await;
    let labels = VehicleLabels::from_status(&status);
    tracing::info!(model = %labels.model, year = %labels.model_year, "vehicle labels resolved");

    let geocode = GeocodeService::new(http.clone(), config.geoapify_api_key.clone());
    let weather = WeatherService::new(http.clone(), config.weather_api_key.clone());
    let poller = Poller::new(api, metrics.clone(), geocode, weather, labels);

    let app = volvo_exporter::routes::create_router(metrics);
    let addr = format!("{}:{}", config.listen_addr, config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "HTTP server terminated");
        }
    });

    let interval = Duration::from_secs(config.poll_interval_secs);
    let error_backoff = Duration::from_secs(10);
    loop {
        let failed = poller.poll_round().await;
        let delay = if failed == volvo_exporter::services::poller::SECTION_COUNT {
            tracing::error!("poll round failed entirely, backing off");
            error_backoff
        } else {
            if failed > 0 {
                tracing::warn!(failed, "poll round completed with failures");
            }
            interval
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}

/// Initialize structured logging with an environment-driven filter.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("volvo_exporter=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
