//! Ingestor - byte source to hand-off channel

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::CandidateRecord;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, instrument, trace, warn};

use crate::channel::{BoundedChannel, PushOutcome};
use crate::config::{IngestorConfig, IngestionMetrics};
use crate::error::{IngestError, Result};
use crate::framer::LineFramer;

/// Why ingestion ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEnd {
    /// Source reported end of stream
    EndOfStream,
    /// Stop flag observed
    Stopped,
}

/// Drives a byte source through the framer into the channel
///
/// The channel is closed whenever `run` returns, so the processor always
/// sees the end of input.
pub struct Ingestor<R> {
    source: R,
    channel: BoundedChannel<CandidateRecord>,
    framer: LineFramer,
    stop: Arc<AtomicBool>,
    metrics: Arc<IngestionMetrics>,
    config: IngestorConfig,
}

impl<R: AsyncRead + Unpin> Ingestor<R> {
    pub fn new(
        source: R,
        channel: BoundedChannel<CandidateRecord>,
        stop: Arc<AtomicBool>,
        config: IngestorConfig,
    ) -> Self {
        Self {
            source,
            channel,
            framer: LineFramer::new(config.max_line_bytes),
            stop,
            metrics: Arc::new(IngestionMetrics::new()),
            config,
        }
    }

    /// Share an existing metrics instance
    pub fn with_metrics(mut self, metrics: Arc<IngestionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Run until end of stream, stop flag or source failure
    ///
    /// # Errors
    /// `IngestError::SourceFatal` on a read error. No internal retry.
    #[instrument(name = "ingestor_run", skip(self), fields(capacity = self.channel.capacity()))]
    pub async fn run(mut self) -> Result<IngestEnd> {
        info!("ingestor started");
        let result = self.read_loop().await;
        self.channel.close();
        self.metrics.update_queue_len(self.channel.len());

        match &result {
            Ok(end) => info!(?end, snapshot = ?self.metrics.snapshot(), "ingestor finished"),
            Err(e) => warn!(error = %e, "ingestor aborted"),
        }
        result
    }

    async fn read_loop(&mut self) -> Result<IngestEnd> {
        let mut buf = vec![0u8; self.config.read_chunk_bytes.max(1)];

        loop {
            if self.stop.load(Ordering::Acquire) {
                debug!("stop flag observed");
                return Ok(IngestEnd::Stopped);
            }

            let read =
                tokio::time::timeout(self.config.read_timeout, self.source.read(&mut buf)).await;

            match read {
                // idle link, re-check the stop flag
                Err(_elapsed) => continue,
                Ok(Ok(0)) => {
                    if let Some(record) = self.framer.finish() {
                        self.forward(record);
                    }
                    self.sync_noise();
                    return Ok(IngestEnd::EndOfStream);
                }
                Ok(Ok(n)) => {
                    self.metrics.record_bytes(n);
                    metrics::counter!("telemetry_relay_bytes_read_total").increment(n as u64);
                    for record in self.framer.push(&buf[..n]) {
                        self.forward(record);
                    }
                    self.sync_noise();
                }
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Ok(Err(e)) => return Err(IngestError::source_fatal(e)),
            }
        }
    }

    fn forward(&self, record: CandidateRecord) {
        self.metrics.record_framed();
        match self.channel.push(record) {
            PushOutcome::Queued => trace!("record queued"),
            PushOutcome::EvictedOldest => {
                self.metrics.record_evicted();
                metrics::counter!("telemetry_relay_records_evicted_total").increment(1);
                debug!("channel full, evicted oldest record");
            }
            PushOutcome::Closed => debug!("channel closed, record dropped"),
        }
        self.metrics.update_queue_len(self.channel.len());
    }

    /// Mirror framer noise into metrics
    fn sync_noise(&self) {
        let total = self.framer.noise();
        let seen = self.metrics.framing_noise.load(Ordering::Relaxed);
        if total > seen {
            self.metrics.record_noise(total - seen);
            metrics::counter!("telemetry_relay_framing_noise_total").increment(total - seen);
        }
    }
}
