// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vehicle listing response and the descriptive label set attached to every
//! vehicle metric series.

use serde::Deserialize;
use serde_json::Value;

/// Vehicle listing envelope (`GET .../vehicles`).
#[derive(Debug, Deserialize)]
pub struct VehicleListResponse {
    #[serde(default)]
    pub data: Vec<VehicleSummary>,
}

/// One vehicle relation entry.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleSummary {
    pub vin: String,
}

/// Descriptive vehicle attributes carried on every metric series.
///
/// The key set is fixed; values come from the `status` endpoint once at
/// startup with "unknown" defaults for anything the vendor omits.
#[derive(Debug, Clone)]
pub struct VehicleLabels {
    pub vin: String,
    pub model: String,
    pub model_year: String,
    pub fuel_type: String,
    pub gearbox: String,
    pub upholstery: String,
    pub battery_capacity_kwh: String,
}

impl VehicleLabels {
    /// Derive labels from the `status` payload.
    pub fn from_status(status: &Value) -> Self {
        Self {
            vin: label_value(status.get("vin")),
            model: label_value(status.get("descriptions").and_then(|d| d.get("model"))),
            model_year: label_value(status.get("modelYear")),
            fuel_type: label_value(status.get("fuelType")),
            gearbox: label_value(status.get("gearbox")),
            upholstery: label_value(status.get("descriptions").and_then(|d| d.get("upholstery"))),
            battery_capacity_kwh: label_value(status.get("batteryCapacityKWH")),
        }
    }

    /// The fixed label pairs for a plain vehicle series.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("vin".to_string(), self.vin.clone()),
            ("model".to_string(), self.model.clone()),
            ("modelYear".to_string(), self.model_year.clone()),
            ("fuelType".to_string(), self.fuel_type.clone()),
            ("gearbox".to_string(), self.gearbox.clone()),
            ("upholstery".to_string(), self.upholstery.clone()),
            (
                "batteryCapacityKWH".to_string(),
                self.battery_capacity_kwh.clone(),
            ),
        ]
    }

    /// Label pairs extended with endpoint-specific qualifiers (unit, status,
    /// address). Callers must pass the same qualifier keys for every sample
    /// of a given series.
    pub fn with(&self, extra: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut pairs = self.to_pairs();
        pairs.extend(
            extra
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        pairs
    }
}

/// Render a JSON value as a label value; non-scalar or missing → "unknown".
fn label_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "unknown".to_string(),
    }
}
