//! DashboardSink - throttled operator view via tracing

use std::time::Duration;

use contracts::{ContractError, Sample, SampleSink, Spo2Band};
use tokio::time::Instant;
use tracing::info;

/// Width of the gauge bars
const BAR_WIDTH: usize = 10;

/// Render `value` on a `[lo, lo + step * 10]` scale as a fixed-width bar
fn bar(value: f64, lo: f64, step: f64) -> String {
    let filled = ((value - lo) / step).clamp(0.0, BAR_WIDTH as f64) as usize;
    format!("{:<width$}", "#".repeat(filled), width = BAR_WIDTH)
}

/// Sink that logs a live summary at most once per interval
pub struct DashboardSink {
    name: String,
    interval: Duration,
    last_render: Option<Instant>,
    renders: u64,
}

impl DashboardSink {
    pub fn new(interval: Duration) -> Self {
        Self {
            name: "dashboard".to_string(),
            interval,
            last_render: None,
            renders: 0,
        }
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }

    fn due(&self, now: Instant) -> bool {
        self.last_render
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    fn render(&self, sample: &Sample) {
        let band = Spo2Band::classify(sample.spo2);
        info!(
            target: "dashboard",
            spo2 = format_args!("{:5.1}%", sample.spo2),
            spo2_bar = %bar(sample.spo2, 70.0, 3.0),
            status = %band,
            heart_rate = sample.heart_rate,
            finger = sample.finger_detected,
            buffer_ready = sample.buffer_ready,
            steps = sample.total_steps,
            calibrated = sample.calibrated,
            accel = format_args!("{:5.1}", sample.accel_total),
            accel_bar = %bar(sample.accel_total, 5.0, 1.5),
            temperature = format_args!("{:4.1}", sample.temperature),
            max30102_ok = sample.device_ok("max30102"),
            mpu6050_ok = sample.device_ok("mpu6050"),
            "live telemetry"
        );
    }
}

impl SampleSink for DashboardSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn persist(&mut self, _sample: &Sample) -> Result<(), ContractError> {
        Ok(())
    }

    fn display(&mut self, sample: &Sample) {
        let now = Instant::now();
        if !self.due(now) {
            return;
        }
        self.render(sample);
        self.last_render = Some(now);
        self.renders += 1;
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
