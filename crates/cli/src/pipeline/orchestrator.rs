//! Pipeline orchestrator - wires source, ingestor, processor and dispatcher.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{CandidateRecord, MetricChannel, RelayBlueprint, SampleRelay};
use dispatcher::{DispatcherBuilder, LocalSinks};
use ingestion::{
    BoundedChannel, DeviceReader, IngestEnd, IngestionMetrics, Ingestor, IngestorConfig,
};
use processor::{Processor, ProcessorConfig, Statistics};
use tokio::io::AsyncRead;
use tracing::{error, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Byte source handed to the ingestor
type Source = Box<dyn AsyncRead + Unpin + Send>;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The relay configuration
    pub blueprint: RelayBlueprint,

    /// Stop after this long (None = until end of source or signal)
    pub timeout: Option<Duration>,

    /// Render the live dashboard
    pub dashboard: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Open the configured source and run to completion
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let path = self
            .config
            .blueprint
            .source
            .path
            .clone()
            .ok_or(CliError::NoSource)?;
        let source = open_source(&path, self.config.blueprint.source.read_chunk_bytes)?;
        self.run_with_source(source, shutdown).await
    }

    /// Run over an already-open byte source
    ///
    /// Ends on end of source, source failure, `shutdown` or the timeout. In
    /// every case queued records are still processed and in-flight collector
    /// sends get the configured grace period.
    pub async fn run_with_source(
        self,
        source: Source,
        shutdown: impl Future<Output = ()>,
    ) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let channel: BoundedChannel<CandidateRecord> =
            BoundedChannel::new(blueprint.pipeline.channel_capacity);

        // Local outputs
        let mut sinks = LocalSinks::from_config(&blueprint.persistence)
            .context("Failed to open local outputs")?;
        if !self.config.dashboard {
            sinks = sinks.without_dashboard();
        }

        // Remote collector
        let dispatcher = if blueprint.collector.enabled {
            let dispatcher = DispatcherBuilder::from_blueprint(blueprint)
                .context("Failed to create dispatcher")?
                .build();
            info!(
                movement = %dispatcher.endpoint(MetricChannel::Movement),
                vital = %dispatcher.endpoint(MetricChannel::Vital),
                "Dispatcher ready"
            );
            Some(Arc::new(dispatcher))
        } else {
            warn!("Collector disabled - samples stay local");
            None
        };

        // Processor
        let statistics = Arc::new(Statistics::new());
        let mut processor = Processor::new(
            channel.clone(),
            sinks,
            stop.clone(),
            ProcessorConfig::from_settings(&blueprint.pipeline, &blueprint.persistence),
        )
        .with_statistics(statistics.clone());
        if let Some(dispatcher) = &dispatcher {
            processor = processor.with_relay(dispatcher.clone() as Arc<dyn SampleRelay>);
        }

        // Ingestor
        let ingest_metrics = Arc::new(IngestionMetrics::new());
        let ingestor = Ingestor::new(
            source,
            channel,
            stop.clone(),
            IngestorConfig::from_settings(&blueprint.source, &blueprint.pipeline),
        )
        .with_metrics(ingest_metrics.clone());

        let process_task = tokio::spawn(processor.run());
        let mut ingest_task = tokio::spawn(ingestor.run());

        info!("Pipeline running");

        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        let finished = tokio::select! {
            joined = &mut ingest_task => Some(joined),
            _ = shutdown => {
                info!(samples = statistics.snapshot().samples, "Stop requested");
                None
            }
            _ = deadline => {
                warn!(
                    timeout = ?self.config.timeout,
                    samples = statistics.snapshot().samples,
                    "Pipeline timed out"
                );
                None
            }
        };

        // Shutdown
        info!("Shutting down pipeline...");
        stop.store(true, Ordering::Release);

        let joined = match finished {
            Some(joined) => joined,
            None => ingest_task.await,
        };
        let source_error = match joined {
            Ok(Ok(IngestEnd::EndOfStream)) => {
                info!("Source reached end of stream");
                None
            }
            Ok(Ok(IngestEnd::Stopped)) => None,
            Ok(Err(e)) => {
                error!(error = %e, "Source failed, draining queued records");
                Some(e.to_string())
            }
            Err(e) => {
                return Err(CliError::pipeline_execution(format!("ingestor task: {e}")).into())
            }
        };

        let processing = process_task
            .await
            .map_err(|e| CliError::pipeline_execution(format!("processor task: {e}")))?;

        let dispatch = match &dispatcher {
            Some(dispatcher) => {
                dispatcher
                    .shutdown(blueprint.pipeline.shutdown_grace())
                    .await;
                Some(dispatcher.metrics())
            }
            None => None,
        };

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            ingestion: ingest_metrics.snapshot(),
            processing,
            dispatch,
            source_error,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.2}", stats.samples_per_sec()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Open the byte source; `-` reads stdin
///
/// Reads happen on a dedicated thread, so a silent device never holds up
/// shutdown.
fn open_source(path: &Path, chunk_bytes: usize) -> Result<Source, CliError> {
    if path == Path::new("-") {
        info!("Reading from stdin");
        let reader = DeviceReader::spawn(std::io::stdin(), chunk_bytes)
            .map_err(|e| CliError::source_open(path, e))?;
        return Ok(Box::new(reader));
    }

    let file = std::fs::File::open(path).map_err(|e| CliError::source_open(path, e))?;
    let reader =
        DeviceReader::spawn(file, chunk_bytes).map_err(|e| CliError::source_open(path, e))?;
    info!(path = %path.display(), "Source opened");
    Ok(Box::new(reader))
}
