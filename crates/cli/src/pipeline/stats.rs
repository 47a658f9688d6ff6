//! Pipeline statistics and end-of-run report.

use std::time::Duration;

use contracts::MetricChannel;
use dispatcher::DispatchSnapshot;
use ingestion::MetricsSnapshot;
use processor::ProcessSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Byte source and framing counters
    pub ingestion: MetricsSnapshot,

    /// Decode/persist counters plus sample statistics
    pub processing: ProcessSummary,

    /// Collector counters (None when the collector was disabled)
    pub dispatch: Option<DispatchSnapshot>,

    /// Why the source ended early, if it failed
    pub source_error: Option<String>,
}

impl PipelineStats {
    /// Decoded samples per second
    pub fn samples_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.processing.samples as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        let stats = &self.processing.statistics;
        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Total samples: {}", stats.samples);
        println!("   ├─ Final steps: {}", stats.last_total_steps);
        println!("   ├─ SpO2 max: {}", percent(stats.max_spo2));
        println!("   ├─ SpO2 min: {}", percent(stats.min_spo2));
        println!(
            "   └─ SpO2 estimated average: {}",
            percent(stats.estimated_average_spo2())
        );

        println!("\n📥 Ingestion");
        println!("   ├─ Bytes read: {}", self.ingestion.bytes_read);
        println!("   ├─ Records framed: {}", self.ingestion.records_framed);
        println!("   ├─ Framing noise: {}", self.ingestion.framing_noise);
        println!("   ├─ Evicted (queue full): {}", self.ingestion.records_evicted);
        println!("   ├─ Decode errors: {}", self.processing.decode_errors);
        println!("   └─ Sink errors: {}", self.processing.sink_errors);

        if let Some(dispatch) = &self.dispatch {
            println!("\n🌐 Collector");
            for (i, channel) in MetricChannel::ALL.iter().enumerate() {
                let prefix = if i + 1 == MetricChannel::ALL.len() { "└─" } else { "├─" };
                let snapshot = dispatch.channel(*channel);
                println!(
                    "   {} {}: sent {}, failed {}, attempts {}, skipped {}",
                    prefix,
                    channel,
                    snapshot.sent,
                    snapshot.failed,
                    snapshot.attempts,
                    snapshot.rate_limited + snapshot.busy + snapshot.deduplicated + snapshot.idle
                );
            }
        }

        if let Some(error) = &self.source_error {
            println!("\n⚠️  Source ended with error: {}", error);
        }

        println!();
    }
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}%"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_per_sec() {
        let mut stats = PipelineStats {
            duration: Duration::from_secs(4),
            ..Default::default()
        };
        stats.processing.samples = 10;
        assert_eq!(stats.samples_per_sec(), 2.5);
        assert_eq!(PipelineStats::default().samples_per_sec(), 0.0);
    }

    #[test]
    fn test_percent_format() {
        assert_eq!(percent(Some(97.26)), "97.3%");
        assert_eq!(percent(None), "n/a");
    }
}
