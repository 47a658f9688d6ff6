//! # Config Loader
//!
//! Loads the relay configuration.
//!
//! Every section of a `RelayBlueprint` has defaults, so a file only needs the
//! keys it changes. Command-line overrides go through `Overrides`, which
//! re-validates the result.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::{ConfigLoader, Overrides};
//! use std::path::Path;
//!
//! let mut blueprint = ConfigLoader::load_from_path(Path::new("relay.toml")).unwrap();
//! Overrides {
//!     source: Some("/dev/ttyUSB0".into()),
//!     ..Default::default()
//! }
//! .apply(&mut blueprint)
//! .unwrap();
//! ```

mod parser;
mod validator;

pub use contracts::RelayBlueprint;
pub use parser::ConfigFormat;

use std::path::{Path, PathBuf};

use contracts::ContractError;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a `.toml` or `.json` file
    ///
    /// # Errors
    /// Unknown extension, unreadable file, parse or validation failure.
    pub fn load_from_path(path: &Path) -> Result<RelayBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate configuration text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RelayBlueprint, ContractError> {
        let blueprint = format.parse(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Validate an already-built blueprint
    pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Effective configuration as TOML, e.g. to seed a config file
    pub fn to_toml(blueprint: &RelayBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &RelayBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

/// Command-line overrides layered on top of a loaded file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Byte source path (`-` for stdin)
    pub source: Option<PathBuf>,
    /// Collector base URL
    pub collector_url: Option<String>,
    /// Disable the collector entirely
    pub offline: bool,
    /// CSV output path
    pub csv_path: Option<PathBuf>,
    /// Disable CSV output
    pub no_csv: bool,
}

impl Overrides {
    /// Apply to `blueprint` and re-validate
    ///
    /// `no_csv` wins over `csv_path`; `offline` wins over `collector_url`.
    pub fn apply(&self, blueprint: &mut RelayBlueprint) -> Result<(), ContractError> {
        if let Some(source) = &self.source {
            blueprint.source.path = Some(source.clone());
        }
        if let Some(url) = &self.collector_url {
            blueprint.collector.base_url = url.clone();
        }
        if self.offline {
            blueprint.collector.enabled = false;
        }
        if let Some(csv) = &self.csv_path {
            blueprint.persistence.csv_path = Some(csv.clone());
        }
        if self.no_csv {
            blueprint.persistence.csv_path = None;
        }
        validator::validate(blueprint)
    }
}
