//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::MetricChannel;

/// Counters for one metric channel
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// Samples offered
    offered: AtomicU64,
    /// Skipped by the rate gate
    rate_limited: AtomicU64,
    /// Skipped because a send was still in flight
    busy: AtomicU64,
    /// Skipped as a duplicate of the last success
    deduplicated: AtomicU64,
    /// Skipped idle movement summaries
    idle: AtomicU64,
    /// HTTP attempts made
    attempts: AtomicU64,
    /// Sends that succeeded
    sent: AtomicU64,
    /// Sends abandoned
    failed: AtomicU64,
}

macro_rules! counter_accessors {
    ($($field:ident => $inc:ident),* $(,)?) => {
        $(
            pub fn $field(&self) -> u64 {
                self.$field.load(Ordering::Relaxed)
            }

            pub fn $inc(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl ChannelMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    counter_accessors! {
        offered => inc_offered,
        rate_limited => inc_rate_limited,
        busy => inc_busy,
        deduplicated => inc_deduplicated,
        idle => inc_idle,
        attempts => inc_attempts,
        sent => inc_sent,
        failed => inc_failed,
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            offered: self.offered(),
            rate_limited: self.rate_limited(),
            busy: self.busy(),
            deduplicated: self.deduplicated(),
            idle: self.idle(),
            attempts: self.attempts(),
            sent: self.sent(),
            failed: self.failed(),
        }
    }
}

/// Snapshot of channel metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ChannelSnapshot {
    pub offered: u64,
    pub rate_limited: u64,
    pub busy: u64,
    pub deduplicated: u64,
    pub idle: u64,
    pub attempts: u64,
    pub sent: u64,
    pub failed: u64,
}

/// Metrics for both channels
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    pub movement: Arc<ChannelMetrics>,
    pub vital: Arc<ChannelMetrics>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, channel: MetricChannel) -> &ChannelMetrics {
        match channel {
            MetricChannel::Movement => &self.movement,
            MetricChannel::Vital => &self.vital,
        }
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            movement: self.movement.snapshot(),
            vital: self.vital.snapshot(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchSnapshot {
    pub movement: ChannelSnapshot,
    pub vital: ChannelSnapshot,
}

impl DispatchSnapshot {
    pub fn channel(&self, channel: MetricChannel) -> &ChannelSnapshot {
        match channel {
            MetricChannel::Movement => &self.movement,
            MetricChannel::Vital => &self.vital,
        }
    }
}
