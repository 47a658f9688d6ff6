//! `run` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{MetricChannel, RelayBlueprint};
use tracing::{info, warn};

use super::{apply_overrides, load_blueprint};
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;
    apply_overrides(&mut blueprint, &args.overrides())?;

    info!(
        source = ?blueprint.source.path,
        collector = blueprint.collector.enabled,
        csv = ?blueprint.persistence.csv_path,
        capacity = blueprint.pipeline.channel_capacity,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        dashboard: !args.no_dashboard,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting pipeline...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        samples = stats.processing.samples,
        decode_errors = stats.processing.decode_errors,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Telemetry Relay finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping pipeline...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RelayBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Source:");
    match &blueprint.source.path {
        Some(path) => println!("  Path: {}", path.display()),
        None => println!("  Path: (not set)"),
    }
    println!(
        "  Baud rate: {} (expected, not set by the relay)",
        blueprint.source.baud_rate
    );
    if let Some(hint) = blueprint.source.line_setup_hint() {
        println!("  Configure the device first: {}", hint);
    }

    println!("\nPipeline:");
    println!("  Channel capacity: {}", blueprint.pipeline.channel_capacity);
    println!("  Shutdown grace: {:?}", blueprint.pipeline.shutdown_grace());

    println!("\nCollector:");
    if blueprint.collector.enabled {
        for channel in MetricChannel::ALL {
            println!("  {}: {}", channel, blueprint.collector.endpoint(channel));
        }
        println!(
            "  Every {:?}, {} attempts",
            blueprint.dispatch.rate_interval(),
            blueprint.dispatch.max_attempts
        );
    } else {
        println!("  (disabled)");
    }

    println!("\nPersistence:");
    match &blueprint.persistence.csv_path {
        Some(path) => println!("  CSV: {}", path.display()),
        None => println!("  CSV: (disabled)"),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["telemetry-relay", "run"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Run(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_overrides_apply() {
        let mut blueprint = RelayBlueprint::default();
        let args = run_args(&["--source", "capture.jsonl", "--offline", "--no-csv"]);
        apply_overrides(&mut blueprint, &args.overrides()).unwrap();

        assert_eq!(blueprint.source.path, Some(PathBuf::from("capture.jsonl")));
        assert!(!blueprint.collector.enabled);
        assert!(blueprint.persistence.csv_path.is_none());
    }

    #[test]
    fn test_bad_collector_url_rejected() {
        let mut blueprint = RelayBlueprint::default();
        let args = run_args(&["--collector-url", "localhost:8000"]);
        assert!(apply_overrides(&mut blueprint, &args.overrides()).is_err());
    }
}
