//! Collector payloads - Dispatcher output
//!
//! Wire shapes expected by the remote collector. Field names on the wire are
//! fixed by the collector API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Independent outbound metric channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricChannel {
    /// Steps, distance and calories
    Movement,
    /// Heart rate and oxygenation
    Vital,
}

impl MetricChannel {
    pub const ALL: [MetricChannel; 2] = [MetricChannel::Movement, MetricChannel::Vital];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movement => "movement",
            Self::Vital => "vital",
        }
    }
}

impl fmt::Display for MetricChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Movement summary posted to the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementPayload {
    /// Distance covered since the last successful send (km)
    #[serde(rename = "km_recorridos")]
    pub distance_km: String,

    /// Steps since the last successful send
    #[serde(rename = "pasos")]
    pub steps: u64,

    /// Seconds since the session started
    #[serde(rename = "tiempo_actividad")]
    pub active_time: String,

    /// Average speed over the send window (km/h)
    #[serde(rename = "velocidad_promedio")]
    pub average_speed: String,

    /// Calories burned since the last successful send
    #[serde(rename = "calorias_quemadas")]
    pub calories: String,

    #[serde(rename = "sesion")]
    pub session: u32,
}

impl MovementPayload {
    /// Nothing happened since the last send
    pub fn is_idle(&self) -> bool {
        self.steps == 0
    }
}

/// Vital signs posted to the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalPayload {
    #[serde(rename = "ritmo_cardiaco")]
    pub heart_rate: u32,

    #[serde(rename = "presion")]
    pub pressure: String,

    /// SpO2 (%), two decimals
    #[serde(rename = "oxigenacion")]
    pub oxygenation: String,

    /// Local date, `YYYY-MM-DD`
    #[serde(rename = "fecha")]
    pub date: String,

    /// Local time, `HH:MM:SS`
    #[serde(rename = "hora")]
    pub time: String,

    #[serde(rename = "sesion")]
    pub session: u32,
}

/// Render a rounded value the way the collector has always received it:
/// shortest representation, always with a fractional part.
pub fn decimal_string(value: f64, places: u32) -> String {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    let rendered = format!("{rounded}");
    if rendered.contains('.') || !rounded.is_finite() {
        rendered
    } else {
        format!("{rendered}.0")
    }
}
