//! Text to `RelayBlueprint`

use std::fmt;
use std::path::Path;

use contracts::{ContractError, RelayBlueprint};

/// Configuration file format, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Case-insensitive extension lookup
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// Format of a config file path
    ///
    /// # Errors
    /// `ConfigParse` when the path has no extension or an unsupported one.
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "{}: cannot determine file format from extension",
                path.display()
            ))
        })?;
        Self::from_extension(ext)
            .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Deserialize `content`; absent keys take their defaults
    pub fn parse(self, content: &str) -> Result<RelayBlueprint, ContractError> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| parse_error(self, e)),
            Self::Json => serde_json::from_str(content).map_err(|e| parse_error(self, e)),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        })
    }
}

fn parse_error<E>(format: ConfigFormat, e: E) -> ContractError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ContractError::ConfigParse {
        message: format!("{format} parse error: {e}"),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_serial_setup_overrides_only_what_it_names() {
        let content = r#"
[source]
path = "/dev/ttyUSB0"

[collector]
base_url = "http://10.0.0.5:8000"
session = 7

[dispatch]
rate_interval_ms = 5000
"#;
        let bp = ConfigFormat::Toml.parse(content).unwrap();
        assert_eq!(bp.source.path.as_deref(), Some(Path::new("/dev/ttyUSB0")));
        assert_eq!(bp.collector.session, 7);
        assert_eq!(bp.dispatch.rate_interval_ms, 5000);
        assert_eq!(bp.dispatch.max_attempts, 3);
        assert_eq!(bp.pipeline.channel_capacity, 10);
    }

    #[test]
    fn test_formula_factors_from_json() {
        let content = r#"{ "formulas": { "km_per_step": 0.00075 } }"#;
        let bp = ConfigFormat::Json.parse(content).unwrap();
        assert_eq!(bp.formulas.km_per_step, 0.00075);
        assert_eq!(bp.formulas.kcal_per_step, 0.04);
    }

    #[test]
    fn test_mistyped_interval_reports_value() {
        let err = ConfigFormat::Toml
            .parse("[dispatch]\nrate_interval_ms = \"fast\"\n")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("TOML parse error"), "{message}");
        assert!(message.contains("\"fast\""), "{message}");
    }

    #[test]
    fn test_json_top_level_must_be_a_table() {
        let err = ConfigFormat::Json.parse("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { source: Some(_), .. }));
    }

    #[test]
    fn test_format_from_path() {
        let format = |p: &str| ConfigFormat::from_path(Path::new(p)).ok();
        assert_eq!(format("relay.toml"), Some(ConfigFormat::Toml));
        assert_eq!(format("conf/Relay.TOML"), Some(ConfigFormat::Toml));
        assert_eq!(format("relay.json"), Some(ConfigFormat::Json));
        assert_eq!(format("relay.yaml"), None);
        assert_eq!(format("relay"), None);
    }
}
