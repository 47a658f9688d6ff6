//! # Contracts
//!
//! Shared interface contracts for the telemetry relay.
//! Every other crate depends on this one; it depends on none of them.
//!
//! ## Data model
//! - `CandidateRecord`: one framed line that looks like a JSON object
//! - `Sample`: a decoded telemetry snapshot
//! - `MovementPayload` / `VitalPayload`: what the remote collector receives
//! - `RelayBlueprint`: the complete runtime configuration

mod blueprint;
mod error;
mod payload;
mod sample;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use payload::*;
pub use sample::*;
pub use sink::*;
