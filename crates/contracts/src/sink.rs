//! Sample consumers - Processor output interfaces
//!
//! `SampleSink` is the local side (persistence + dashboard), `SampleRelay` the
//! remote side (collector dispatch).

use crate::{ContractError, Sample};

/// Local sample output
///
/// Implementations must keep `persist` fast (buffered I/O); the processor
/// awaits it inline.
#[trait_variant::make(SampleSink: Send)]
pub trait LocalSampleSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist one sample
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn persist(&mut self, sample: &Sample) -> Result<(), ContractError>;

    /// Render one sample for the operator
    fn display(&mut self, sample: &Sample);

    /// Flush buffered output
    async fn flush(&mut self) -> Result<(), ContractError>;
}

/// Remote sample output
///
/// `offer` must return promptly: any network work happens on tasks the relay
/// spawns itself.
pub trait SampleRelay: Send + Sync {
    fn offer(&self, sample: &Sample);
}
