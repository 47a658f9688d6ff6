//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{MetricChannel, RelayBlueprint};
use serde::Serialize;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    source: SourceInfo,
    collector: CollectorInfo,
    dispatch: DispatchInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    csv_path: Option<String>,
}

#[derive(Serialize)]
struct SourceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    /// Expected line speed; the relay does not configure the device
    expected_baud_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_setup: Option<String>,
    channel_capacity: usize,
}

#[derive(Serialize)]
struct CollectorInfo {
    enabled: bool,
    movement_url: String,
    vital_url: String,
    session: u32,
}

#[derive(Serialize)]
struct DispatchInfo {
    rate_interval_ms: u64,
    dedup_window_ms: u64,
    max_attempts: u32,
    retry_delay_ms: u64,
    attempt_timeout_ms: u64,
    send_zero_movement: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let blueprint = load_blueprint(args.config.as_deref())?;

    if args.json {
        let json = serde_json::to_string_pretty(&build_config_info(&blueprint))
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else if args.toml {
        let toml = config_loader::ConfigLoader::to_toml(&blueprint)
            .context("Failed to serialize configuration")?;
        print!("{}", toml);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &RelayBlueprint) -> ConfigInfo {
    let dispatch = &blueprint.dispatch;
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        source: SourceInfo {
            path: blueprint
                .source
                .path
                .as_ref()
                .map(|p| p.display().to_string()),
            expected_baud_rate: blueprint.source.baud_rate,
            line_setup: blueprint.source.line_setup_hint(),
            channel_capacity: blueprint.pipeline.channel_capacity,
        },
        collector: CollectorInfo {
            enabled: blueprint.collector.enabled,
            movement_url: blueprint.collector.endpoint(MetricChannel::Movement),
            vital_url: blueprint.collector.endpoint(MetricChannel::Vital),
            session: blueprint.collector.session,
        },
        dispatch: DispatchInfo {
            rate_interval_ms: dispatch.rate_interval_ms,
            dedup_window_ms: dispatch.dedup_window_ms,
            max_attempts: dispatch.max_attempts,
            retry_delay_ms: dispatch.retry_delay_ms,
            attempt_timeout_ms: dispatch.attempt_timeout_ms,
            send_zero_movement: dispatch.send_zero_movement,
        },
        csv_path: blueprint
            .persistence
            .csv_path
            .as_ref()
            .map(|p| p.display().to_string()),
    }
}

fn print_config_info(blueprint: &RelayBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Telemetry Relay Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let source = &blueprint.source;
    println!("📡 Source");
    println!("   ├─ Version: {:?}", blueprint.version);
    match &source.path {
        Some(path) => println!("   ├─ Path: {}", path.display()),
        None => println!("   ├─ Path: (not set)"),
    }
    println!(
        "   ├─ Baud rate: {} (expected, not set by the relay)",
        source.baud_rate
    );
    if let Some(hint) = source.line_setup_hint() {
        println!("   ├─ Line setup: {}", hint);
    }
    println!("   └─ Channel capacity: {}", blueprint.pipeline.channel_capacity);

    let collector = &blueprint.collector;
    println!("\n🌐 Collector");
    if collector.enabled {
        for channel in MetricChannel::ALL {
            println!("   ├─ {}: {}", channel, collector.endpoint(channel));
        }
        println!("   ├─ Session: {}", collector.session);
        println!("   └─ Pressure: {}", collector.pressure);
    } else {
        println!("   └─ (disabled)");
    }

    let dispatch = &blueprint.dispatch;
    println!("\n⚙️  Dispatch");
    println!("   ├─ Rate interval: {:?}", dispatch.rate_interval());
    println!("   ├─ Dedup window: {:?}", dispatch.dedup_window());
    println!(
        "   ├─ Attempts: {} (delay {:?}, timeout {:?})",
        dispatch.max_attempts,
        dispatch.retry_delay(),
        dispatch.attempt_timeout()
    );
    println!("   └─ Send zero movement: {}", dispatch.send_zero_movement);

    println!("\n💾 Persistence");
    match &blueprint.persistence.csv_path {
        Some(path) => println!("   ├─ CSV: {}", path.display()),
        None => println!("   ├─ CSV: (disabled)"),
    }
    println!(
        "   └─ Dashboard every {:?}",
        blueprint.persistence.dashboard_interval()
    );

    println!();
}
