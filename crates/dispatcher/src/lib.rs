//! # Dispatcher
//!
//! Sample output stage.
//!
//! Responsibilities:
//! - Derive movement/vital payloads from decoded samples
//! - Rate gate, dedup and single-flight per channel
//! - Bounded retry against the remote collector without blocking the processor
//! - Local persistence (CSV) and the operator dashboard

mod channel;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod retry;
pub mod sinks;
pub mod transport;

pub use channel::{Offer, SkipReason};
pub use dispatcher::{check_collector, DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, TransportError};
pub use metrics::{ChannelMetrics, ChannelSnapshot, DispatchMetrics, DispatchSnapshot};
pub use policy::{
    local_clock, DispatchState, MovementPolicy, PayloadPolicy, StepFormula, StepFormulas,
    VitalPolicy, WallClock,
};
pub use retry::{send_with_retry, RetryPolicy, StatusClass};
pub use sinks::{CsvSink, DashboardSink, LocalSinks, CSV_HEADER};
pub use transport::{CollectorTransport, HttpTransport, LocalCollectorTransport, USER_AGENT};
