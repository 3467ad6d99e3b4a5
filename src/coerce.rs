// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coercion of heterogeneous vendor JSON values into gauge samples.
//!
//! The vehicle API mixes numbers, numeric strings and enumerated state
//! strings across endpoints. Everything funnels through these helpers so a
//! missing or unparseable field degrades to 0.0 instead of failing a round.

use serde_json::Value;

/// Convert a JSON value to f64, defaulting to 0.0 for anything non-numeric.
pub fn as_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Collapse an enumerated state string to a binary gauge: 1.0 when the value
/// (case-insensitively) matches one of `active`, 0.0 otherwise.
///
/// Used for charging (CHARGING), plug (CONNECTED), charger power
/// (PROVIDING_POWER), engine (RUNNING) and window (OPEN/OPENING) states.
/// This is a deliberately lossy mapping of multi-valued vendor enums.
pub fn binary_state(value: Option<&Value>, active: &[&str]) -> f64 {
    match value {
        Some(Value::String(s)) => {
            let upper = s.to_uppercase();
            if active.iter().any(|a| *a == upper) {
                1.0
            } else {
                0.0
            }
        }
        other => as_f64(other),
    }
}

/// Map a tyre pressure status to an ordinal severity scale.
///
/// NO_WARNING=0, VERY_LOW_PRESSURE=1, LOW_PRESSURE=2, HIGH_PRESSURE=3;
/// absent or unrecognized values default to 0.
pub fn tyre_severity(status: Option<&str>) -> f64 {
    match status.map(|s| s.to_uppercase()).as_deref() {
        Some("VERY_LOW_PRESSURE") => 1.0,
        Some("LOW_PRESSURE") => 2.0,
        Some("HIGH_PRESSURE") => 3.0,
        _ => 0.0,
    }
}

/// Derive a stable metric-name fragment from a vendor field name.
///
/// Lowercases and replaces spaces so the same field always yields the same
/// series name.
pub fn metric_key(field: &str) -> String {
    field.replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_f64_passthrough_and_parse() {
        assert_eq!(as_f64(Some(&json!(42))), 42.0);
        assert_eq!(as_f64(Some(&json!(3.5))), 3.5);
        assert_eq!(as_f64(Some(&json!("17.25"))), 17.25);
    }

    #[test]
    fn test_as_f64_defaults_to_zero() {
        assert_eq!(as_f64(Some(&json!("not a number"))), 0.0);
        assert_eq!(as_f64(Some(&json!(null))), 0.0);
        assert_eq!(as_f64(Some(&json!({"value": 1}))), 0.0);
        assert_eq!(as_f64(None), 0.0);
    }

    #[test]
    fn test_binary_state() {
        assert_eq!(binary_state(Some(&json!("CHARGING")), &["CHARGING"]), 1.0);
        assert_eq!(binary_state(Some(&json!("charging")), &["CHARGING"]), 1.0);
        assert_eq!(binary_state(Some(&json!("IDLE")), &["CHARGING"]), 0.0);
        assert_eq!(
            binary_state(Some(&json!("OPENING")), &["OPEN", "OPENING"]),
            1.0
        );
        assert_eq!(binary_state(None, &["CHARGING"]), 0.0);
    }

    #[test]
    fn test_binary_state_numeric_fallback() {
        // Non-string values fall back to numeric coercion.
        assert_eq!(binary_state(Some(&json!(1)), &["OPEN"]), 1.0);
    }

    #[test]
    fn test_tyre_severity_ordinal() {
        assert_eq!(tyre_severity(Some("NO_WARNING")), 0.0);
        assert_eq!(tyre_severity(Some("VERY_LOW_PRESSURE")), 1.0);
        assert_eq!(tyre_severity(Some("LOW_PRESSURE")), 2.0);
        assert_eq!(tyre_severity(Some("low_pressure")), 2.0);
        assert_eq!(tyre_severity(Some("HIGH_PRESSURE")), 3.0);
    }

    #[test]
    fn test_tyre_severity_default() {
        assert_eq!(tyre_severity(None), 0.0);
        assert_eq!(tyre_severity(Some("UNSPECIFIED")), 0.0);
        assert_eq!(tyre_severity(Some("SOMETHING_NEW")), 0.0);
    }

    #[test]
    fn test_metric_key() {
        assert_eq!(metric_key("averageSpeed"), "averagespeed");
        assert_eq!(metric_key("trip meter 1"), "trip_meter_1");
    }
}
