//! # Processor
//!
//! Consumer side of the hand-off channel.
//!
//! Responsibilities:
//! - Decode candidate records, dropping malformed ones
//! - Maintain running `Statistics`
//! - Persist and display every sample through a `SampleSink`
//! - Offer every sample to the collector relay without blocking
//!
//! ## Usage Example
//!
//! ```ignore
//! use processor::{Processor, ProcessorConfig};
//!
//! let processor = Processor::new(channel, sinks, stop.clone(), ProcessorConfig::default())
//!     .with_relay(dispatcher.clone());
//! let summary = processor.run().await;
//! println!("{} samples", summary.samples);
//! ```

mod processor;
mod statistics;

pub use processor::{ProcessSummary, Processor, ProcessorConfig};
pub use statistics::{Statistics, StatisticsSnapshot};
