//! Configuration validation
//!
//! Rules:
//! - channel capacity, read chunk and line limit > 0
//! - all timeouts and intervals > 0 (dedup window may be 0)
//! - at least one dispatch attempt
//! - collector URL is http(s) when the collector is enabled
//! - formula factors are finite and non-negative

use contracts::{ContractError, RelayBlueprint};

/// Validate a RelayBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_source(blueprint)?;
    validate_pipeline(blueprint)?;
    validate_collector(blueprint)?;
    validate_dispatch(blueprint)?;
    validate_formulas(blueprint)?;
    Ok(())
}

fn require_positive(field: &str, value: u64) -> Result<(), ContractError> {
    if value == 0 {
        return Err(ContractError::config_validation(field, "must be > 0"));
    }
    Ok(())
}

fn validate_source(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let source = &blueprint.source;
    require_positive("source.read_timeout_ms", source.read_timeout_ms)?;
    require_positive("source.read_chunk_bytes", source.read_chunk_bytes as u64)?;
    Ok(())
}

fn validate_pipeline(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let pipeline = &blueprint.pipeline;
    require_positive("pipeline.channel_capacity", pipeline.channel_capacity as u64)?;
    require_positive("pipeline.pop_timeout_ms", pipeline.pop_timeout_ms)?;
    require_positive("pipeline.max_line_bytes", pipeline.max_line_bytes as u64)?;
    Ok(())
}

fn validate_collector(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let collector = &blueprint.collector;
    if !collector.enabled {
        return Ok(());
    }

    let url = collector.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ContractError::config_validation(
            "collector.base_url",
            format!("expected an http:// or https:// URL, got '{}'", collector.base_url),
        ));
    }

    for (field, path) in [
        ("collector.movement_path", &collector.movement_path),
        ("collector.vital_path", &collector.vital_path),
    ] {
        if path.trim().is_empty() {
            return Err(ContractError::config_validation(field, "path cannot be empty"));
        }
    }
    Ok(())
}

fn validate_dispatch(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let dispatch = &blueprint.dispatch;
    require_positive("dispatch.rate_interval_ms", dispatch.rate_interval_ms)?;
    require_positive("dispatch.max_attempts", dispatch.max_attempts as u64)?;
    require_positive("dispatch.attempt_timeout_ms", dispatch.attempt_timeout_ms)?;
    Ok(())
}

fn validate_formulas(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let formulas = &blueprint.formulas;
    for (field, value) in [
        ("formulas.km_per_step", formulas.km_per_step),
        ("formulas.kcal_per_step", formulas.kcal_per_step),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("must be a finite value >= 0, got {value}"),
            ));
        }
    }
    Ok(())
}
