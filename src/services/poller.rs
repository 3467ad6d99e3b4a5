// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Polling pipeline: one round fetches every endpoint, converts the
//! heterogeneous vendor payloads into gauge samples and applies the
//! location/weather enrichment.
//!
//! Sections are isolated: a failure in one endpoint is logged and swallowed
//! at the section boundary, because a partial metrics snapshot is strictly
//! better than no snapshot.

use crate::coerce::{as_f64, binary_state, metric_key, tyre_severity};
use crate::error::{ExporterError, Result};
use crate::metrics::MetricSet;
use crate::models::VehicleLabels;
use crate::services::geocode::GeocodeService;
use crate::services::volvo::VolvoClient;
use crate::services::weather::WeatherService;
use serde_json::Value;
use std::sync::Arc;

/// Warning-lamp fields mapped to pre-declared series.
const WARNING_FIELDS: &[(&str, &str, &str)] = &[
    ("brakeLightCenterWarning", "volvo_brake_center_warning", "Brake center warning"),
    ("brakeLightLeftWarning", "volvo_brake_left_warning", "Brake left warning"),
    ("brakeLightRightWarning", "volvo_brake_right_warning", "Brake right warning"),
    ("fogLightFrontWarning", "volvo_fog_front_warning", "Fog front warning"),
    ("fogLightRearWarning", "volvo_fog_rear_warning", "Fog rear warning"),
    ("positionLightFrontLeftWarning", "volvo_pos_front_left_warning", "Position front left warning"),
    ("positionLightFrontRightWarning", "volvo_pos_front_right_warning", "Position front right warning"),
    ("positionLightRearLeftWarning", "volvo_pos_rear_left_warning", "Position rear left warning"),
    ("positionLightRearRightWarning", "volvo_pos_rear_right_warning", "Position rear right warning"),
    ("highBeamLeftWarning", "volvo_high_left_warning", "High beam left warning"),
    ("highBeamRightWarning", "volvo_high_right_warning", "High beam right warning"),
    ("lowBeamLeftWarning", "volvo_low_left_warning", "Low beam left warning"),
    ("lowBeamRightWarning", "volvo_low_right_warning", "Low beam right warning"),
    ("daytimeRunningLightLeftWarning", "volvo_day_left_warning", "Daytime left warning"),
    ("daytimeRunningLightRightWarning", "volvo_day_right_warning", "Daytime right warning"),
    ("turnIndicationFrontLeftWarning", "volvo_turn_front_left_warning", "Turn front left warning"),
    ("turnIndicationFrontRightWarning", "volvo_turn_front_right_warning", "Turn front right warning"),
    ("turnIndicationRearLeftWarning", "volvo_turn_rear_left_warning", "Turn rear left warning"),
    ("turnIndicationRearRightWarning", "volvo_turn_rear_right_warning", "Turn rear right warning"),
    ("registrationPlateLightWarning", "volvo_plate_light_warning", "Plate light warning"),
    ("sideMarkLightsWarning", "volvo_side_mark_warning", "Side marker warning"),
    ("hazardLightsWarning", "volvo_hazard_warning", "Hazard warning"),
    ("reverseLightsWarning", "volvo_reverse_warning", "Reverse light warning"),
];

/// Tyre positions mapped to ordinal severity gauges.
const TYRE_FIELDS: &[(&str, &str, &str)] = &[
    ("frontLeft", "volvo_tyre_front_left", "Front left tyre status"),
    ("frontRight", "volvo_tyre_front_right", "Front right tyre status"),
    ("rearLeft", "volvo_tyre_rear_left", "Rear left tyre status"),
    ("rearRight", "volvo_tyre_rear_right", "Rear right tyre status"),
];

/// Diagnostics fields carrying a unit qualifier.
const DIAGNOSTIC_FIELDS: &[(&str, &str, &str)] = &[
    ("serviceWarning", "volvo_service_warning", "Service warning"),
    ("serviceTrigger", "volvo_service_trigger", "Service trigger"),
    ("engineHoursToService", "volvo_engine_hours_service", "Engine hours to service"),
    ("distanceToService", "volvo_distance_service", "Distance to service"),
    ("washerFluidLevelWarning", "volvo_washer_fluid_warning", "Washer fluid warning"),
    ("timeToService", "volvo_time_service", "Time to service"),
];

/// Number of endpoint sections in one polling round.
pub const SECTION_COUNT: usize = 9;

/// Drives one full polling round against a single vehicle.
pub struct Poller {
    api: Arc<VolvoClient>,
    metrics: Arc<MetricSet>,
    geocode: GeocodeService,
    weather: WeatherService,
    labels: VehicleLabels,
}

impl Poller {
    pub fn new(
        api: Arc<VolvoClient>,
        metrics: Arc<MetricSet>,
        geocode: GeocodeService,
        weather: WeatherService,
        labels: VehicleLabels,
    ) -> Self {
        Self {
            api,
            metrics,
            geocode,
            weather,
            labels,
        }
    }

    /// Run one polling round. Returns the number of failed sections; every
    /// failure has already been logged and isolated.
    pub async fn poll_round(&self) -> usize {
        tracing::debug!("poll round start");

        let sections: [(&str, Result<()>); SECTION_COUNT] = [
            ("status", self.poll_status().await),
            ("odometer", self.poll_odometer().await),
            ("statistics", self.poll_statistics().await),
            ("energy", self.poll_energy().await),
            ("engine-status", self.poll_engine().await),
            ("warnings", self.poll_warnings().await),
            ("tyres", self.poll_tyres().await),
            ("diagnostics", self.poll_diagnostics().await),
            ("location", self.poll_location().await),
        ];

        let mut failed = 0;
        for (endpoint, result) in sections {
            if let Err(e) = result {
                tracing::debug!(endpoint, error = %e, "endpoint skipped this round");
                failed += 1;
            }
        }
        failed
    }

    /// Fetch one endpoint, requiring a non-empty object payload.
    async fn fetch(&self, endpoint: &str) -> Result<Value> {
        let payload = self.api.vehicle_data(endpoint).await;
        match payload.as_object() {
            Some(map) if !map.is_empty() => Ok(payload),
            _ => Err(ExporterError::endpoint(endpoint, "empty payload")),
        }
    }

    async fn poll_status(&self) -> Result<()> {
        let status = self.fetch("status").await?;
        let battery = as_f64(status.get("batteryCapacityKWH"));
        self.metrics.set_gauge(
            "volvo_battery_level_percent",
            "Battery level %",
            self.labels.to_pairs(),
            battery,
        );
        tracing::info!(battery, "status ok");
        Ok(())
    }

    async fn poll_odometer(&self) -> Result<()> {
        let data = self.fetch("odometer").await?;
        let odometer = data.get("odometer");
        let value = as_f64(odometer.and_then(|o| o.get("value")));
        let unit = odometer
            .and_then(|o| o.get("unit"))
            .and_then(Value::as_str)
            .unwrap_or("km");
        self.metrics.set_gauge(
            "volvo_odometer_km",
            "Odometer (km)",
            self.labels.with(&[("unit", unit)]),
            value,
        );
        tracing::info!(odometer = value, unit, "odometer ok");
        Ok(())
    }

    /// Statistics: dynamic metric materialization plus the range series.
    ///
    /// The field set is vendor-driven and not known at compile time, so a
    /// series is created on first encounter of each key and reused after.
    async fn poll_statistics(&self) -> Result<()> {
        let stats = self.fetch("statistics").await?;
        let map = stats
            .as_object()
            .ok_or_else(|| ExporterError::endpoint("statistics", "non-object payload"))?;

        for (key, data) in map {
            let Some(obj) = data.as_object() else {
                continue;
            };
            if !obj.contains_key("value") {
                continue;
            }

            let name = format!("volvo_stats_{}_value", metric_key(key));
            let unit = obj.get("unit").and_then(Value::as_str).unwrap_or("unknown");
            let help = format!("Statistics {key} ({unit})");
            self.metrics.set_gauge(
                &name,
                &help,
                self.labels.with(&[("unit", unit)]),
                as_f64(obj.get("value")),
            );
        }

        if let Some(range) = map.get("distanceToEmptyBattery").and_then(|d| d.get("value")) {
            self.metrics.set_gauge(
                "volvo_range_km",
                "Remaining range km",
                self.labels.to_pairs(),
                as_f64(Some(range)),
            );
        }
        tracing::info!(fields = map.len(), "statistics ok");
        Ok(())
    }

    /// Energy: binary charge/plug/power gauges plus dynamic per-field
    /// series carrying a status qualifier.
    async fn poll_energy(&self) -> Result<()> {
        let energy = self.fetch("energy").await?;
        let map = energy
            .as_object()
            .ok_or_else(|| ExporterError::endpoint("energy", "non-object payload"))?;

        let field_value = |field: &str| map.get(field).and_then(|f| f.get("value"));

        let charging = binary_state(field_value("chargingStatus"), &["CHARGING"]);
        self.metrics.set_gauge(
            "volvo_charge_state",
            "Charging (1=charging, 0=idle)",
            self.labels.to_pairs(),
            charging,
        );
        self.metrics.set_gauge(
            "volvo_plug_state",
            "Plug connected (1=yes, 0=no)",
            self.labels.to_pairs(),
            binary_state(field_value("chargerConnectionStatus"), &["CONNECTED"]),
        );
        self.metrics.set_gauge(
            "volvo_power_status",
            "Charger power status (1=providing power)",
            self.labels.to_pairs(),
            binary_state(field_value("chargerPowerStatus"), &["PROVIDING_POWER"]),
        );
        self.metrics.set_gauge(
            "volvo_charging_power",
            "Charging power in Watt",
            self.labels.to_pairs(),
            as_f64(field_value("chargingPower")),
        );

        for (key, data) in map {
            let Some(obj) = data.as_object() else {
                continue;
            };
            if !obj.contains_key("value") {
                continue;
            }

            let stripped = key.replace("Status", "").replace("Level", "");
            let name = format!("volvo_energy_{}_value", metric_key(&stripped));
            let help = format!("Energy {key} value");
            let status = obj
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("UNKNOWN")
                .to_uppercase();
            let value = as_f64(obj.get("value"));

            // electricRange additionally carries its unit.
            if key == "electricRange" {
                let unit = obj.get("unit").and_then(Value::as_str).unwrap_or("unknown");
                self.metrics.set_gauge(
                    &name,
                    &help,
                    self.labels.with(&[("status", &status), ("unit", unit)]),
                    value,
                );
            } else {
                self.metrics.set_gauge(
                    &name,
                    &help,
                    self.labels.with(&[("status", &status)]),
                    value,
                );
            }
        }

        tracing::info!(
            state = if charging > 0.0 { "CHARGING" } else { "IDLE" },
            "energy ok"
        );
        Ok(())
    }

    async fn poll_engine(&self) -> Result<()> {
        let engine = self.fetch("engine-status").await?;
        let running = binary_state(
            engine.get("engineStatus").and_then(|s| s.get("value")),
            &["RUNNING"],
        );
        self.metrics.set_gauge(
            "volvo_engine_status",
            "Engine status (1=running)",
            self.labels.to_pairs(),
            running,
        );
        tracing::info!(running, "engine ok");
        Ok(())
    }

    async fn poll_warnings(&self) -> Result<()> {
        let warnings = self.fetch("warnings").await?;
        for (field, name, help) in WARNING_FIELDS {
            let value = as_f64(warnings.get(*field).and_then(|w| w.get("value")));
            self.metrics
                .set_gauge(name, help, self.labels.to_pairs(), value);
        }
        tracing::info!("warnings ok");
        Ok(())
    }

    async fn poll_tyres(&self) -> Result<()> {
        let tyres = self.fetch("tyres").await?;
        for (field, name, help) in TYRE_FIELDS {
            let status = tyres
                .get(*field)
                .and_then(|t| t.get("value"))
                .and_then(Value::as_str);
            self.metrics
                .set_gauge(name, help, self.labels.to_pairs(), tyre_severity(status));
        }
        tracing::info!("tyres ok");
        Ok(())
    }

    async fn poll_diagnostics(&self) -> Result<()> {
        let diagnostics = self.fetch("diagnostics").await?;
        for (field, name, help) in DIAGNOSTIC_FIELDS {
            let obj = diagnostics.get(*field);
            let value = as_f64(obj.and_then(|o| o.get("value")));
            let unit = obj
                .and_then(|o| o.get("unit"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            self.metrics
                .set_gauge(name, help, self.labels.with(&[("unit", unit)]), value);
        }
        tracing::info!("diagnostics ok");
        Ok(())
    }

    /// Location plus the address/weather enrichment.
    ///
    /// Requires at least three coordinate components (GeoJSON order:
    /// longitude, latitude, altitude); otherwise no location series are set
    /// and neither enrichment lookup runs this round.
    async fn poll_location(&self) -> Result<()> {
        let location = self.fetch("location").await?;
        let coordinates = location
            .get("geometry")
            .and_then(|g| g.get("coordinates"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        if coordinates.len() < 3 {
            return Err(ExporterError::endpoint(
                "location",
                "missing or incomplete coordinates",
            ));
        }

        let lon = as_f64(coordinates.first());
        let lat = as_f64(coordinates.get(1));
        let alt = as_f64(coordinates.get(2));

        let address = self.geocode.resolve(&self.labels.vin, lat, lon).await;
        let labels = self.labels.with(&[("address", &address)]);
        self.metrics.set_gauge(
            "volvo_location_latitude",
            "Last known latitude",
            labels.clone(),
            lat,
        );
        self.metrics.set_gauge(
            "volvo_location_longitude",
            "Last known longitude",
            labels.clone(),
            lon,
        );
        self.metrics.set_gauge(
            "volvo_location_altitude",
            "Last known altitude",
            labels,
            alt,
        );
        tracing::info!(lat, lon, alt, "location ok");

        // Weather is independent and best-effort; a failure here must not
        // disturb the location series already set.
        if let Some(weather) = self.weather.fetch(lat, lon).await {
            let pairs = self.labels.to_pairs();
            self.metrics.set_gauge(
                "weather_temperature_celsius",
                "Current temperature",
                pairs.clone(),
                weather.temp,
            );
            self.metrics.set_gauge(
                "weather_feels_like_celsius",
                "Feels like temperature",
                pairs.clone(),
                weather.feels_like,
            );
            self.metrics.set_gauge(
                "weather_temp_min_celsius",
                "Temperature minimum",
                pairs.clone(),
                weather.temp_min,
            );
            self.metrics.set_gauge(
                "weather_temp_max_celsius",
                "Temperature maximum",
                pairs.clone(),
                weather.temp_max,
            );
            self.metrics.set_gauge(
                "weather_pressure_hpa",
                "Atmospheric pressure (hPa)",
                pairs.clone(),
                weather.pressure,
            );
            self.metrics.set_gauge(
                "weather_humidity_percent",
                "Relative humidity (%)",
                pairs,
                weather.humidity,
            );
            tracing::info!(temp = weather.temp, humidity = weather.humidity, "weather ok");
        }
        Ok(())
    }
}
