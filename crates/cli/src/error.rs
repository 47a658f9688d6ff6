//! Error types for CLI operations.

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// No byte source given in config or on the command line
    #[error("No source configured (set source.path or pass --source)")]
    NoSource,

    /// Byte source could not be opened
    #[error("Failed to open source {}: {source}", path.display())]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Collector check failed
    #[error("Collector at {url} unreachable: {message}")]
    CollectorUnreachable { url: String, message: String },

    /// Collector answered, but not with a success status
    #[error("Collector at {url} answered with HTTP {status}")]
    CollectorRejected { url: String, status: u16 },

    /// Pipeline execution error
    #[error("Pipeline execution failed: {message}")]
    PipelineExecution { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn source_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceOpen {
            path: path.into(),
            source,
        }
    }

    pub fn collector_unreachable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CollectorUnreachable {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn collector_rejected(url: impl Into<String>, status: u16) -> Self {
        Self::CollectorRejected {
            url: url.into(),
            status,
        }
    }

    pub fn pipeline_execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
