//! Ingestion settings and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use contracts::{PipelineSettings, SourceConfig};

use crate::framer::DEFAULT_MAX_LINE_BYTES;

/// Ingestor tuning
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Upper bound on one read before the stop flag is re-checked
    pub read_timeout: Duration,

    /// Read buffer size
    pub read_chunk_bytes: usize,

    /// Longest partial line kept
    pub max_line_bytes: usize,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
            read_chunk_bytes: 1024,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl IngestorConfig {
    pub fn from_settings(source: &SourceConfig, pipeline: &PipelineSettings) -> Self {
        Self {
            read_timeout: source.read_timeout(),
            read_chunk_bytes: source.read_chunk_bytes.max(1),
            max_line_bytes: pipeline.max_line_bytes,
        }
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Bytes read from the source
    pub bytes_read: AtomicU64,

    /// Candidate records framed
    pub records_framed: AtomicU64,

    /// Lines dropped by the framer
    pub framing_noise: AtomicU64,

    /// Records evicted from a full channel
    pub records_evicted: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_bytes(&self, n: usize) {
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_framed(&self) {
        self.records_framed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_noise(&self, n: u64) {
        self.framing_noise.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_evicted(&self) {
        self.records_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            records_framed: self.records_framed.load(Ordering::Relaxed),
            framing_noise: self.framing_noise.load(Ordering::Relaxed),
            records_evicted: self.records_evicted.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub records_framed: u64,
    pub framing_noise: u64,
    pub records_evicted: u64,
    pub queue_len: usize,
}
