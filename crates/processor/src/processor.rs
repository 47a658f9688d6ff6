//! Processor - channel to statistics, sinks and relay

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    CandidateRecord, PersistenceConfig, PipelineSettings, Sample, SampleRelay, SampleSink,
};
use ingestion::{BoundedChannel, Popped};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::statistics::{Statistics, StatisticsSnapshot};

/// Processor tuning
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// How long to wait on an empty channel before re-checking the stop flag
    pub pop_timeout: Duration,

    /// Progress line every N samples (0 disables)
    pub progress_every: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            pop_timeout: Duration::from_millis(500),
            progress_every: 50,
        }
    }
}

impl ProcessorConfig {
    pub fn from_settings(pipeline: &PipelineSettings, persistence: &PersistenceConfig) -> Self {
        Self {
            pop_timeout: pipeline.pop_timeout(),
            progress_every: persistence.progress_every,
        }
    }
}

/// Result of a processor run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessSummary {
    /// Candidate records taken from the channel
    pub records: u64,
    /// Records that decoded into a sample
    pub samples: u64,
    pub decode_errors: u64,
    pub sink_errors: u64,
    pub statistics: StatisticsSnapshot,
}

/// Drains the hand-off channel and fans samples out
pub struct Processor<S> {
    channel: BoundedChannel<CandidateRecord>,
    sink: S,
    relay: Option<Arc<dyn SampleRelay>>,
    statistics: Arc<Statistics>,
    stop: Arc<AtomicBool>,
    config: ProcessorConfig,
    summary: ProcessSummary,
}

impl<S: SampleSink> Processor<S> {
    pub fn new(
        channel: BoundedChannel<CandidateRecord>,
        sink: S,
        stop: Arc<AtomicBool>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            channel,
            sink,
            relay: None,
            statistics: Arc::new(Statistics::new()),
            stop,
            config,
            summary: ProcessSummary::default(),
        }
    }

    /// Offer every sample to a remote relay as well
    pub fn with_relay(mut self, relay: Arc<dyn SampleRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Share an existing statistics instance
    pub fn with_statistics(mut self, statistics: Arc<Statistics>) -> Self {
        self.statistics = statistics;
        self
    }

    /// Run until the channel is closed and drained
    ///
    /// On the stop flag the channel is closed and whatever is queued is still
    /// processed.
    #[instrument(name = "processor_run", skip(self), fields(sink = %self.sink.name()))]
    pub async fn run(mut self) -> ProcessSummary {
        info!("processor started");

        loop {
            if self.stop.load(Ordering::Acquire) && self.channel.close() {
                debug!(queued = self.channel.len(), "stop flag observed, draining");
            }

            match self.channel.pop_timeout(self.config.pop_timeout).await {
                Popped::Item(record) => {
                    observability::record_queue_depth(self.channel.len());
                    self.handle(record).await
                }
                Popped::Empty => continue,
                Popped::Closed => break,
            }
        }

        if let Err(e) = self.sink.flush().await {
            warn!(error = %e, "sink flush failed");
        }

        self.summary.statistics = self.statistics.snapshot();
        info!(
            records = self.summary.records,
            samples = self.summary.samples,
            decode_errors = self.summary.decode_errors,
            sink_errors = self.summary.sink_errors,
            "processor finished"
        );
        self.summary
    }

    async fn handle(&mut self, record: CandidateRecord) {
        self.summary.records += 1;

        let sample = match ingestion::decode(&record) {
            Ok(sample) => sample,
            Err(e) => {
                self.summary.decode_errors += 1;
                observability::record_decode_error();
                debug!(error = %e, record = %record, "dropping undecodable record");
                return;
            }
        };

        self.summary.samples += 1;
        observability::record_sample(&sample);
        self.statistics.record(&sample);

        if let Err(e) = self.sink.persist(&sample).await {
            self.summary.sink_errors += 1;
            observability::record_sink_error(self.sink.name());
            warn!(error = %e, "persist failed");
        }
        self.sink.display(&sample);

        if let Some(relay) = &self.relay {
            relay.offer(&sample);
        }

        self.log_progress(&sample);
    }

    fn log_progress(&self, sample: &Sample) {
        let every = self.config.progress_every;
        if every == 0 || self.summary.samples % every != 0 {
            return;
        }
        info!(
            samples = self.summary.samples,
            total_steps = sample.total_steps,
            spo2 = sample.spo2,
            heart_rate = sample.heart_rate,
            "progress"
        );
    }
}
