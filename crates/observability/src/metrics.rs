//! Relay metric helpers
//!
//! Thin wrappers over the `metrics` facade so every stage records under the
//! same `telemetry_relay_*` names and labels.

use contracts::{MetricChannel, Sample};
use metrics::{counter, gauge, histogram};

/// Record one decoded sample
///
/// Called by the processor for every sample it accepts.
pub fn record_sample(sample: &Sample) {
    counter!("telemetry_relay_samples_total").increment(1);

    gauge!("telemetry_relay_heart_rate_bpm").set(sample.heart_rate as f64);
    gauge!("telemetry_relay_total_steps").set(sample.total_steps as f64);
    gauge!("telemetry_relay_temperature_celsius").set(sample.temperature);

    // zero means "no reading", keep it out of the distribution
    if sample.has_spo2() {
        gauge!("telemetry_relay_spo2_percent").set(sample.spo2);
        histogram!("telemetry_relay_spo2_percent_hist").record(sample.spo2);
    }

    for (device, ok) in &sample.sensor_status {
        gauge!("telemetry_relay_device_ok", "device" => device.clone())
            .set(if *ok { 1.0 } else { 0.0 });
    }
}

/// Record a candidate record that failed to decode
pub fn record_decode_error() {
    counter!("telemetry_relay_decode_errors_total").increment(1);
}

/// Record a failed local sink write
pub fn record_sink_error(sink_name: &str) {
    counter!(
        "telemetry_relay_sink_errors_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// Record hand-off queue depth
pub fn record_queue_depth(depth: usize) {
    gauge!("telemetry_relay_queue_depth").set(depth as f64);
}

/// Record a finished collector send
pub fn record_dispatch(channel: MetricChannel, success: bool) {
    let status = if success { "sent" } else { "failed" };
    counter!(
        "telemetry_relay_dispatch_total",
        "channel" => channel.as_str(),
        "status" => status
    )
    .increment(1);
}

/// Record how many attempts a delivered payload needed
pub fn record_dispatch_attempts(channel: MetricChannel, attempts: u32) {
    histogram!(
        "telemetry_relay_dispatch_attempts",
        "channel" => channel.as_str()
    )
    .record(attempts as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without an installed recorder every helper is a no-op; these only check
    // that label construction does not panic.
    #[test]
    fn test_helpers_without_recorder() {
        let mut sample = Sample {
            spo2: 97.0,
            heart_rate: 70,
            ..Default::default()
        };
        sample.sensor_status.insert("mpu6050".to_string(), true);

        record_sample(&sample);
        record_sample(&Sample::default());
        record_decode_error();
        record_sink_error("csv");
        record_queue_depth(3);
        for channel in MetricChannel::ALL {
            record_dispatch(channel, true);
            record_dispatch(channel, false);
            record_dispatch_attempts(channel, 2);
        }
    }
}
