//! RelayBlueprint - Config Loader output
//!
//! Describes the complete runtime: byte source, hand-off buffer, collector,
//! dispatch policy, step formulas and local persistence.
//! Every field is defaulted so an empty file is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::MetricChannel;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Byte source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Ingestion/processing hand-off settings
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Remote collector endpoints
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Rate gate, dedup and retry policy
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Step conversion factors
    #[serde(default)]
    pub formulas: FormulaConfig,

    /// Local persistence and dashboard
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Byte source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Device or capture file path; `-` reads stdin
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Line speed the firmware uses. Not applied: the device is read as an
    /// ordinary file, so it must already be set up (see `line_setup_hint`).
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Upper bound on a single read before the stop flag is re-checked
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Read buffer size
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            read_chunk_bytes: default_read_chunk_bytes(),
        }
    }
}

impl SourceConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Shell command that puts a serial device into the expected mode
    ///
    /// `None` for stdin or an unset path.
    pub fn line_setup_hint(&self) -> Option<String> {
        let path = self.path.as_ref().filter(|p| p.as_os_str() != "-")?;
        Some(format!(
            "stty -F {} {} raw -echo",
            path.display(),
            self.baud_rate
        ))
    }
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout_ms() -> u64 {
    100
}

fn default_read_chunk_bytes() -> usize {
    1024
}

/// Ingestion/processing hand-off settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Bounded channel capacity (drop-oldest when full)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How long the processor waits on an empty channel before re-checking
    /// the stop flag
    #[serde(default = "default_pop_timeout_ms")]
    pub pop_timeout_ms: u64,

    /// Longest partial line kept while waiting for a newline
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// How long shutdown waits for in-flight collector sends
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            pop_timeout_ms: default_pop_timeout_ms(),
            max_line_bytes: default_max_line_bytes(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl PipelineSettings {
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn default_channel_capacity() -> usize {
    10
}

fn default_pop_timeout_ms() -> u64 {
    500
}

fn default_max_line_bytes() -> usize {
    4096
}

fn default_shutdown_grace_ms() -> u64 {
    6000
}

/// Remote collector endpoints and static payload fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Disable to run without any outbound traffic
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Scheme + host + port, e.g. `http://127.0.0.1:8000`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_movement_path")]
    pub movement_path: String,

    #[serde(default = "default_vital_path")]
    pub vital_path: String,

    /// Session id stamped on every payload
    #[serde(default = "default_session")]
    pub session: u32,

    /// Blood pressure string sent with vitals (no sensor on the device)
    #[serde(default = "default_pressure")]
    pub pressure: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            movement_path: default_movement_path(),
            vital_path: default_vital_path(),
            session: default_session(),
            pressure: default_pressure(),
        }
    }
}

impl CollectorConfig {
    /// Full endpoint URL for a channel
    pub fn endpoint(&self, channel: MetricChannel) -> String {
        let path = match channel {
            MetricChannel::Movement => &self.movement_path,
            MetricChannel::Vital => &self.vital_path,
        };
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_movement_path() -> String {
    "/metrics/caminata/".to_string()
}

fn default_vital_path() -> String {
    "/metrics/corazon/".to_string()
}

fn default_session() -> u32 {
    1
}

fn default_pressure() -> String {
    "120/80".to_string()
}

/// Rate gate, dedup and retry policy shared by both channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Minimum interval between send attempts per channel
    #[serde(default = "default_rate_interval_ms")]
    pub rate_interval_ms: u64,

    /// Identical payloads within this window of the last success are skipped
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,

    /// Attempts per send, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Timeout of a single HTTP attempt
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Keep posting movement summaries with zero steps so the remote view
    /// shows quiescence
    #[serde(default = "default_true")]
    pub send_zero_movement: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rate_interval_ms: default_rate_interval_ms(),
            dedup_window_ms: default_dedup_window_ms(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            send_zero_movement: true,
        }
    }
}

impl DispatchConfig {
    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

fn default_rate_interval_ms() -> u64 {
    3000
}

fn default_dedup_window_ms() -> u64 {
    1500
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_attempt_timeout_ms() -> u64 {
    5000
}

/// Linear step conversion factors
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FormulaConfig {
    #[serde(default = "default_km_per_step")]
    pub km_per_step: f64,

    #[serde(default = "default_kcal_per_step")]
    pub kcal_per_step: f64,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            km_per_step: default_km_per_step(),
            kcal_per_step: default_kcal_per_step(),
        }
    }
}

fn default_km_per_step() -> f64 {
    0.0008
}

fn default_kcal_per_step() -> f64 {
    0.04
}

/// Local persistence and dashboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// CSV output file; `None` disables persistence
    #[serde(default = "default_csv_path")]
    pub csv_path: Option<PathBuf>,

    /// Minimum interval between dashboard renders
    #[serde(default = "default_dashboard_interval_ms")]
    pub dashboard_interval_ms: u64,

    /// Log a progress line every N samples (0 disables)
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            dashboard_interval_ms: default_dashboard_interval_ms(),
            progress_every: default_progress_every(),
        }
    }
}

impl PersistenceConfig {
    pub fn dashboard_interval(&self) -> Duration {
        Duration::from_millis(self.dashboard_interval_ms)
    }
}

fn default_csv_path() -> Option<PathBuf> {
    Some(PathBuf::from("datos/sensores_completos.csv"))
}

fn default_dashboard_interval_ms() -> u64 {
    2000
}

fn default_progress_every() -> u64 {
    50
}
