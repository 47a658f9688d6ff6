//! # Ingestion
//!
//! Serial telemetry ingestion.
//!
//! Responsibilities:
//! - Frame the byte stream into candidate records (`LineFramer`)
//! - Decode candidates into `Sample`s (`decode`)
//! - Bounded hand-off with drop-oldest backpressure (`BoundedChannel`)
//! - Drive a byte source until end of stream, stop or failure (`Ingestor`)
//! - Read blocking devices off the runtime (`DeviceReader`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{BoundedChannel, Ingestor, IngestorConfig};
//!
//! let channel = BoundedChannel::new(10);
//! let ingestor = Ingestor::new(serial, channel.clone(), stop.clone(), IngestorConfig::default());
//! tokio::spawn(ingestor.run());
//!
//! while let Some(record) = channel.pop().await {
//!     let sample = ingestion::decode(&record)?;
//! }
//! ```

mod channel;
mod config;
mod decoder;
mod device;
mod error;
mod framer;
mod ingestor;
mod mock;

// Re-exports
pub use channel::{BoundedChannel, Popped, PushOutcome, DEFAULT_CHANNEL_CAPACITY};
pub use config::{IngestionMetrics, IngestorConfig, MetricsSnapshot};
pub use contracts::{CandidateRecord, Sample};
pub use decoder::{decode, decode_str};
pub use device::DeviceReader;
pub use error::{DecodeError, IngestError, Result};
pub use framer::{LineFramer, DEFAULT_MAX_LINE_BYTES};
pub use ingestor::{IngestEnd, Ingestor};
pub use mock::ScriptedSource;
