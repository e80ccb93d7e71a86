use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{config::ComfortConfig, types::SensorKind};

/// IR presence needs body heat on top of motion; ambient surfaces sit well
/// below this.
const IR_HEAT_MIN_C: f64 = 30.0;

/// mmWave detections below this confidence are treated as noise.
const MMWAVE_MIN_CONFIDENCE: f64 = 0.7;

/// Valid mmWave target range in meters. Closer is usually a reflection off
/// the sensor housing, farther is outside the room.
const MMWAVE_MIN_DISTANCE_M: f64 = 0.5;
const MMWAVE_MAX_DISTANCE_M: f64 = 5.0;

#[derive(Debug, Error, PartialEq)]
pub enum TelemetryError {
    #[error("telemetry payload is not a JSON object")]
    NotAnObject,
    #[error("unknown sensor type {0:?}")]
    UnknownSensorKind(String),
}

/// One canonical reading derived from a raw inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub occupied: bool,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub sensor_kind: SensorKind,
    pub received_at: DateTime<Utc>,
}

/// Turn a raw reading into a canonical [`Observation`].
///
/// Total over field content: missing or garbled fields degrade to the
/// configured neutral defaults instead of failing, so partial telemetry never
/// stalls the control loop. The only rejects are payloads that are not JSON
/// objects and unrecognized `sensor_type` labels; on either, the caller logs
/// and drops the message without touching room state.
pub fn normalize(
    raw: &Value,
    config: &ComfortConfig,
    received_at: DateTime<Utc>,
) -> Result<Observation, TelemetryError> {
    let fields = raw.as_object().ok_or(TelemetryError::NotAnObject)?;

    let sensor_kind = match fields.get("sensor_type") {
        None | Some(Value::Null) => SensorKind::Pir,
        Some(value) => {
            let label = match value {
                Value::String(label) => label.clone(),
                other => other.to_string(),
            };
            SensorKind::from_wire(&label).ok_or(TelemetryError::UnknownSensorKind(label))?
        }
    };

    Ok(Observation {
        occupied: derive_presence(sensor_kind, fields),
        temperature_c: number_field(fields, "temperature", config.default_temperature_c),
        humidity_pct: number_field(fields, "humidity", config.default_humidity_pct),
        sensor_kind,
        received_at,
    })
}

/// Presence is polymorphic over the sensor kind: each modality consults its
/// own auxiliary fields.
fn derive_presence(kind: SensorKind, fields: &Map<String, Value>) -> bool {
    let movement = bool_field(fields, "movement")
        .or_else(|| bool_field(fields, "occupied"))
        .unwrap_or(false);

    match kind {
        SensorKind::Pir => pir_presence(movement),
        SensorKind::Ir => ir_presence(movement, number_field(fields, "heat", 0.0)),
        SensorKind::MmWave => mmwave_presence(
            movement,
            number_field(fields, "confidence", 0.0),
            number_field(fields, "distance", 0.0),
        ),
    }
}

fn pir_presence(movement: bool) -> bool {
    movement
}

fn ir_presence(movement: bool, heat_c: f64) -> bool {
    movement && heat_c > IR_HEAT_MIN_C
}

fn mmwave_presence(movement: bool, confidence: f64, distance_m: f64) -> bool {
    movement
        && confidence > MMWAVE_MIN_CONFIDENCE
        && distance_m > MMWAVE_MIN_DISTANCE_M
        && distance_m < MMWAVE_MAX_DISTANCE_M
}

/// Lenient numeric extraction: accepts JSON numbers and numeric strings,
/// falls back on anything non-finite or unparseable.
fn number_field(fields: &Map<String, Value>, key: &str, fallback: f64) -> f64 {
    let Some(value) = fields.get(key) else {
        return fallback;
    };

    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.filter(|number| number.is_finite()).unwrap_or(fallback)
}

fn bool_field(fields: &Map<String, Value>, key: &str) -> Option<bool> {
    match fields.get(key)? {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn received() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn config() -> ComfortConfig {
        ComfortConfig::default()
    }

    #[test]
    fn pir_presence_follows_movement() {
        let raw = json!({ "movement": true, "temperature": 27.0, "humidity": 55.0 });
        let obs = normalize(&raw, &config(), received()).unwrap();

        assert_eq!(obs.sensor_kind, SensorKind::Pir);
        assert!(obs.occupied);
        assert_eq!(obs.temperature_c, 27.0);
        assert_eq!(obs.humidity_pct, 55.0);
    }

    #[test]
    fn missing_sensor_type_defaults_to_pir() {
        let raw = json!({ "movement": false });
        let obs = normalize(&raw, &config(), received()).unwrap();

        assert_eq!(obs.sensor_kind, SensorKind::Pir);
        assert!(!obs.occupied);
    }

    #[test]
    fn occupied_is_accepted_as_movement_alias() {
        let raw = json!({ "occupied": true, "temperature": 24.0 });
        let obs = normalize(&raw, &config(), received()).unwrap();

        assert!(obs.occupied);
    }

    #[test]
    fn ir_requires_movement_and_heat() {
        let warm = json!({ "sensor_type": "IR", "movement": true, "heat": 36.5 });
        let cold = json!({ "sensor_type": "IR", "movement": true, "heat": 22.0 });
        let still = json!({ "sensor_type": "IR", "movement": false, "heat": 36.5 });

        assert!(normalize(&warm, &config(), received()).unwrap().occupied);
        assert!(!normalize(&cold, &config(), received()).unwrap().occupied);
        assert!(!normalize(&still, &config(), received()).unwrap().occupied);
    }

    #[test]
    fn mmwave_low_confidence_is_not_occupied() {
        // Confidence below 0.7 loses regardless of movement and distance.
        let raw = json!({
            "sensor_type": "mmWave",
            "movement": true,
            "confidence": 0.5,
            "distance": 2.0,
        });
        let obs = normalize(&raw, &config(), received()).unwrap();

        assert_eq!(obs.sensor_kind, SensorKind::MmWave);
        assert!(!obs.occupied);
    }

    #[test]
    fn mmwave_distance_window_is_exclusive() {
        let inside = json!({
            "sensor_type": "mmWave", "movement": true, "confidence": 0.9, "distance": 2.0,
        });
        let too_close = json!({
            "sensor_type": "mmWave", "movement": true, "confidence": 0.9, "distance": 0.5,
        });
        let too_far = json!({
            "sensor_type": "mmWave", "movement": true, "confidence": 0.9, "distance": 5.0,
        });

        assert!(normalize(&inside, &config(), received()).unwrap().occupied);
        assert!(!normalize(&too_close, &config(), received()).unwrap().occupied);
        assert!(!normalize(&too_far, &config(), received()).unwrap().occupied);
    }

    #[test]
    fn unknown_sensor_type_is_an_error() {
        let raw = json!({ "sensor_type": "LIDAR", "movement": true });

        assert_eq!(
            normalize(&raw, &config(), received()),
            Err(TelemetryError::UnknownSensorKind("LIDAR".to_string()))
        );
    }

    #[test]
    fn non_object_payload_is_an_error() {
        assert_eq!(
            normalize(&json!([1, 2, 3]), &config(), received()),
            Err(TelemetryError::NotAnObject)
        );
        assert_eq!(
            normalize(&json!("ON"), &config(), received()),
            Err(TelemetryError::NotAnObject)
        );
    }

    #[test]
    fn missing_numbers_fall_back_to_neutral_defaults() {
        let raw = json!({ "movement": true });
        let obs = normalize(&raw, &config(), received()).unwrap();

        assert_eq!(obs.temperature_c, 25.0);
        assert_eq!(obs.humidity_pct, 60.0);
    }

    #[test]
    fn garbled_numbers_fall_back_and_stay_finite() {
        let raw = json!({
            "movement": true,
            "temperature": "not-a-number",
            "humidity": { "nested": true },
        });
        let obs = normalize(&raw, &config(), received()).unwrap();

        assert!(obs.temperature_c.is_finite());
        assert!(obs.humidity_pct.is_finite());
        assert_eq!(obs.temperature_c, 25.0);
        assert_eq!(obs.humidity_pct, 60.0);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let raw = json!({ "movement": true, "temperature": "27.5", "humidity": " 48 " });
        let obs = normalize(&raw, &config(), received()).unwrap();

        assert_eq!(obs.temperature_c, 27.5);
        assert_eq!(obs.humidity_pct, 48.0);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let raw = json!({
            "movement": true,
            "temperature": 26.5,
            "battery": 87,
            "firmware": "2.1.0",
        });

        assert!(normalize(&raw, &config(), received()).is_ok());
    }

    #[test]
    fn movement_string_literals_are_tolerated() {
        let raw = json!({ "movement": "true", "temperature": 25.0 });
        let obs = normalize(&raw, &config(), received()).unwrap();

        assert!(obs.occupied);
    }
}
