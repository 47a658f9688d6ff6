//! Sample decoding
//!
//! Lenient by design of the firmware protocol: older builds omit fields and
//! some emit integers as floats. Missing or mistyped fields take their zero
//! value; only unparseable JSON or a non-object top level is rejected.

use contracts::{CandidateRecord, DeviceHealth, Sample};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Decode one framed record
pub fn decode(record: &CandidateRecord) -> Result<Sample, DecodeError> {
    decode_str(record.as_str())
}

/// Decode raw text
pub fn decode_str(text: &str) -> Result<Sample, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(fields) = value else {
        return Err(DecodeError::NotAnObject {
            found: kind(&value),
        });
    };

    Ok(Sample {
        spo2: float(&fields, "spo2"),
        heart_rate: saturating_u32(unsigned(&fields, "ritmo_cardiaco")),
        ir_value: saturating_u32(unsigned(&fields, "ir_value")),
        red_value: saturating_u32(unsigned(&fields, "red_value")),
        finger_detected: flag(&fields, "finger_detected"),
        buffer_ready: flag(&fields, "spo2_buffer_ready"),
        accel_x: float(&fields, "acel_x"),
        accel_y: float(&fields, "acel_y"),
        accel_z: float(&fields, "acel_z"),
        accel_total: float(&fields, "acel_total"),
        gyro_x: float(&fields, "gyro_x"),
        gyro_y: float(&fields, "gyro_y"),
        gyro_z: float(&fields, "gyro_z"),
        temperature: float(&fields, "temperatura"),
        total_steps: unsigned(&fields, "pasos_totales"),
        step_threshold: float(&fields, "umbral_pasos"),
        calibrated: flag(&fields, "calibrado"),
        sensor_status: health(&fields, "sensor_status"),
    })
}

fn float(fields: &Map<String, Value>, key: &str) -> f64 {
    fields
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or_default()
}

fn unsigned(fields: &Map<String, Value>, key: &str) -> u64 {
    match fields.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_else(|| {
            // floats truncate, negatives fall back to zero
            n.as_f64()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64)
                .unwrap_or_default()
        }),
        _ => 0,
    }
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn flag(fields: &Map<String, Value>, key: &str) -> bool {
    fields.get(key).and_then(Value::as_bool).unwrap_or_default()
}

fn health(fields: &Map<String, Value>, key: &str) -> DeviceHealth {
    match fields.get(key) {
        Some(Value::Object(devices)) => devices
            .iter()
            .filter_map(|(name, ok)| ok.as_bool().map(|ok| (name.clone(), ok)))
            .collect(),
        _ => DeviceHealth::new(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
