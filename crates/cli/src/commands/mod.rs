//! Command implementations.

mod info;
mod ping;
mod run;
mod validate;

use std::path::Path;

use config_loader::Overrides;
use contracts::RelayBlueprint;
use tracing::info;

use crate::error::{CliError, Result};

pub use info::run_info;
pub use ping::run_ping;
pub use run::run_pipeline;
pub use validate::run_validate;

/// Load a blueprint from `path`, or the defaults when no path is given
fn load_blueprint(path: Option<&Path>) -> Result<RelayBlueprint> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(RelayBlueprint::default());
    };

    if !path.exists() {
        return Err(CliError::config_not_found(path));
    }

    info!(config = %path.display(), "Loading configuration");
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}

/// Apply command-line overrides and re-validate
fn apply_overrides(blueprint: &mut RelayBlueprint, overrides: &Overrides) -> Result<()> {
    info!(?overrides, "Applying command-line overrides");
    overrides.apply(blueprint)?;
    Ok(())
}
