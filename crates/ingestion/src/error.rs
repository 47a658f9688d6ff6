//! Ingestion error types

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestError {
    /// The byte source failed; ingestion stops, the processor keeps draining
    #[error("byte source failed: {source}")]
    SourceFatal {
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub fn source_fatal(source: std::io::Error) -> Self {
        Self::SourceFatal { source }
    }
}

/// A candidate record that did not decode into a `Sample`
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not valid JSON
    #[error("invalid json: {0}")]
    Syntax(#[from] serde_json::Error),

    /// Valid JSON, but the top level is not an object
    #[error("expected a json object, found {found}")]
    NotAnObject { found: &'static str },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestError>;
