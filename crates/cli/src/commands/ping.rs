//! `ping` command implementation.

use std::time::Duration;

use anyhow::Result;
use config_loader::Overrides;
use contracts::MetricChannel;
use dispatcher::{check_collector, DispatchError, HttpTransport};
use tracing::{info, warn};

use super::{apply_overrides, load_blueprint};
use crate::cli::PingArgs;
use crate::error::CliError;

/// Execute the `ping` command
///
/// Only a 2xx answer counts as ready. Any other status is reported as a
/// warning and fails the command.
pub async fn run_ping(args: &PingArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;
    let overrides = Overrides {
        collector_url: args.collector_url.clone(),
        ..Default::default()
    };
    apply_overrides(&mut blueprint, &overrides)?;

    let url = blueprint.collector.endpoint(MetricChannel::Movement);
    info!(url = %url, "Checking collector");

    let transport = HttpTransport::new()?;
    let timeout = Duration::from_secs(args.timeout.max(1));
    match check_collector(&transport, &blueprint.collector, timeout).await {
        Ok(status) => {
            println!("✓ Collector reachable: {} (HTTP {})", url, status);
            Ok(())
        }
        Err(DispatchError::Rejected { status }) => {
            warn!(url = %url, status, "Collector answered with a non-success status");
            println!("⚠ Collector answered with HTTP {}: {}", status, url);
            Err(CliError::collector_rejected(url, status).into())
        }
        Err(e) => {
            println!("✗ Collector unreachable: {}", url);
            Err(CliError::collector_unreachable(url, e.to_string()).into())
        }
    }
}
