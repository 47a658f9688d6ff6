//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::RelayBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source: Option<String>,
    collector_enabled: bool,
    collector_url: String,
    csv_path: Option<String>,
    channel_capacity: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    source: blueprint
                        .source
                        .path
                        .as_ref()
                        .map(|p| p.display().to_string()),
                    collector_enabled: blueprint.collector.enabled,
                    collector_url: blueprint.collector.base_url.clone(),
                    csv_path: blueprint
                        .persistence
                        .csv_path
                        .as_ref()
                        .map(|p| p.display().to_string()),
                    channel_capacity: blueprint.pipeline.channel_capacity,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.source.path.is_none() {
        warnings.push("source.path is not set - `run` needs --source".to_string());
    }

    if !blueprint.collector.enabled && blueprint.persistence.csv_path.is_none() {
        warnings.push("Collector and CSV both disabled - samples are only displayed".to_string());
    }

    let dispatch = &blueprint.dispatch;
    if dispatch.dedup_window_ms < dispatch.rate_interval_ms {
        warnings.push(format!(
            "dispatch.dedup_window_ms ({}) is shorter than rate_interval_ms ({}) - \
             duplicate suppression never triggers",
            dispatch.dedup_window_ms, dispatch.rate_interval_ms
        ));
    }

    let worst_case = dispatch.max_attempts as u64 * dispatch.attempt_timeout_ms
        + dispatch.max_attempts.saturating_sub(1) as u64 * dispatch.retry_delay_ms;
    if worst_case > blueprint.pipeline.shutdown_grace_ms {
        warnings.push(format!(
            "pipeline.shutdown_grace_ms ({}) is shorter than a worst-case send ({} ms)",
            blueprint.pipeline.shutdown_grace_ms, worst_case
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Source: {}", summary.source.as_deref().unwrap_or("(not set)"));
            if summary.collector_enabled {
                println!("  Collector: {}", summary.collector_url);
            } else {
                println!("  Collector: (disabled)");
            }
            println!("  CSV: {}", summary.csv_path.as_deref().unwrap_or("(disabled)"));
            println!("  Channel capacity: {}", summary.channel_capacity);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
