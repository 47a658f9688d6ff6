//! Bounded retry around a single collector send

use std::time::Duration;

use contracts::DispatchConfig;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::metrics::ChannelMetrics;
use crate::transport::CollectorTransport;

/// Attempts, delay and per-attempt timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.retry_delay(),
            attempt_timeout: config.attempt_timeout(),
        }
    }
}

/// How a response status is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    Terminal,
}

impl StatusClass {
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            500..=599 => Self::Retryable,
            _ => Self::Terminal,
        }
    }
}

/// POST `body` until it succeeds, fails terminally or attempts run out
///
/// Returns the number of attempts used on success.
pub async fn send_with_retry<T: CollectorTransport>(
    transport: &T,
    url: &str,
    body: &Value,
    policy: RetryPolicy,
    metrics: &ChannelMetrics,
) -> Result<u32, DispatchError> {
    let mut reason = String::new();

    for attempt in 1..=policy.max_attempts {
        metrics.inc_attempts();
        let outcome =
            tokio::time::timeout(policy.attempt_timeout, transport.post_json(url, body)).await;

        match outcome {
            Ok(Ok(status)) => match StatusClass::of(status) {
                StatusClass::Success => return Ok(attempt),
                StatusClass::Terminal => return Err(DispatchError::Rejected { status }),
                StatusClass::Retryable => reason = format!("server error status {status}"),
            },
            Ok(Err(e)) => reason = e.to_string(),
            Err(_elapsed) => {
                reason = format!("no response within {:?}", policy.attempt_timeout)
            }
        }

        if attempt < policy.max_attempts {
            debug!(attempt, %reason, "attempt failed, retrying");
            tokio::time::sleep(policy.delay).await;
        }
    }

    warn!(attempts = policy.max_attempts, %reason, "giving up");
    Err(DispatchError::transient(policy.max_attempts, reason))
}
