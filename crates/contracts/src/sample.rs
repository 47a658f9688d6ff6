//! Sample - decoder output
//!
//! One telemetry snapshot as emitted by the wearable firmware.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Device name -> health flag, as reported in `sensor_status`
pub type DeviceHealth = BTreeMap<String, bool>;

/// Raw text framed from the byte stream that looks like one JSON object.
///
/// Only the framer creates these, so holding one means the text is trimmed and
/// starts with `{` and ends with `}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord(String);

impl CandidateRecord {
    /// Wrap already-validated text
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CandidateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded telemetry snapshot
///
/// Every field has a zero value so partial payloads from older firmware still
/// decode. Serialized field names are the firmware's; the derived
/// `Deserialize` is strict about types, `ingestion::decode` is the lenient
/// path used on live input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sample {
    /// Oxygen saturation (%), 0 when no reading
    pub spo2: f64,

    /// Heart rate (bpm)
    #[serde(rename = "ritmo_cardiaco")]
    pub heart_rate: u32,

    /// Raw infrared intensity
    pub ir_value: u32,

    /// Raw red intensity
    pub red_value: u32,

    /// Finger on the optical sensor
    pub finger_detected: bool,

    /// SpO2 averaging buffer is full
    #[serde(rename = "spo2_buffer_ready")]
    pub buffer_ready: bool,

    #[serde(rename = "acel_x")]
    pub accel_x: f64,
    #[serde(rename = "acel_y")]
    pub accel_y: f64,
    #[serde(rename = "acel_z")]
    pub accel_z: f64,

    /// Smoothed acceleration magnitude (m/s²)
    #[serde(rename = "acel_total")]
    pub accel_total: f64,

    /// Angular rate per axis (°/s)
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,

    /// Temperature (°C)
    #[serde(rename = "temperatura")]
    pub temperature: f64,

    /// Cumulative step count since device boot
    #[serde(rename = "pasos_totales")]
    pub total_steps: u64,

    /// Acceleration threshold the step detector currently uses
    #[serde(rename = "umbral_pasos")]
    pub step_threshold: f64,

    /// Step detector finished calibrating
    #[serde(rename = "calibrado")]
    pub calibrated: bool,

    /// Per-device health flags
    pub sensor_status: DeviceHealth,
}

impl Sample {
    /// Health flag for a device, `false` when the device is not reported
    pub fn device_ok(&self, device: &str) -> bool {
        self.sensor_status.get(device).copied().unwrap_or(false)
    }

    /// Whether the sample carries an oxygen reading at all
    pub fn has_spo2(&self) -> bool {
        self.spo2 > 0.0
    }

    pub fn spo2_band(&self) -> Spo2Band {
        Spo2Band::classify(self.spo2)
    }
}

/// Coarse SpO2 classification used by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spo2Band {
    Excellent,
    Normal,
    Low,
    Critical,
}

impl Spo2Band {
    pub fn classify(spo2: f64) -> Self {
        if spo2 >= 95.0 {
            Self::Excellent
        } else if spo2 >= 90.0 {
            Self::Normal
        } else if spo2 >= 85.0 {
            Self::Low
        } else {
            Self::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Spo2Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
