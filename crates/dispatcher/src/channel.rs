//! One metric channel: rate gate, dedup, single-flight send, state commit

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{DispatchConfig, Sample};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};

use crate::metrics::ChannelMetrics;
use crate::policy::{DispatchState, PayloadPolicy};
use crate::retry::{send_with_retry, RetryPolicy};
use crate::transport::CollectorTransport;

/// Why an offered sample did not start a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Last attempt started less than the rate interval ago
    RateLimited,
    /// Previous send still running
    InFlight,
    /// Same payload as the last success, inside the dedup window
    Duplicate,
    /// Policy declined to send (idle movement)
    Idle,
    /// Payload could not be serialized
    Unencodable,
}

/// What `offer` did with a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Started,
    Skipped(SkipReason),
}

struct Slot<P> {
    committed: DispatchState<P>,
    last_attempt: Option<Instant>,
    in_flight: bool,
}

impl<P> Default for Slot<P> {
    fn default() -> Self {
        Self {
            committed: DispatchState::default(),
            last_attempt: None,
            in_flight: false,
        }
    }
}

type SharedSlot<P> = Arc<Mutex<Slot<P>>>;

fn lock<P>(slot: &Mutex<Slot<P>>) -> MutexGuard<'_, Slot<P>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Dispatch state machine for one channel
pub(crate) struct ChannelDispatcher<P: PayloadPolicy, T> {
    policy: P,
    slot: SharedSlot<P::Payload>,
    transport: Arc<T>,
    url: Arc<str>,
    retry: RetryPolicy,
    rate_interval: Duration,
    dedup_window: Duration,
    metrics: Arc<ChannelMetrics>,
    tasks: Mutex<JoinSet<()>>,
}

impl<P, T> ChannelDispatcher<P, T>
where
    P: PayloadPolicy,
    T: CollectorTransport + Sync + 'static,
{
    pub(crate) fn new(
        policy: P,
        transport: Arc<T>,
        url: String,
        config: &DispatchConfig,
        metrics: Arc<ChannelMetrics>,
    ) -> Self {
        Self {
            policy,
            slot: Arc::new(Mutex::new(Slot::default())),
            transport,
            url: url.into(),
            retry: RetryPolicy::from_config(config),
            rate_interval: config.rate_interval(),
            dedup_window: config.dedup_window(),
            metrics,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// Committed state, for inspection
    pub(crate) fn state(&self) -> DispatchState<P::Payload> {
        lock(&self.slot).committed.clone()
    }

    /// Decide whether `sample` triggers a send and start it if so. Never waits.
    pub(crate) fn offer(&self, sample: &Sample) -> Offer {
        let now = Instant::now();
        self.metrics.inc_offered();

        let (payload, body) = {
            let mut slot = lock(&self.slot);

            if let Some(last) = slot.last_attempt {
                if now.saturating_duration_since(last) < self.rate_interval {
                    self.metrics.inc_rate_limited();
                    return Offer::Skipped(SkipReason::RateLimited);
                }
            }
            if slot.in_flight {
                self.metrics.inc_busy();
                return Offer::Skipped(SkipReason::InFlight);
            }

            let payload = self.policy.derive(sample, &slot.committed, now);
            if self.policy.is_idle(&payload) {
                self.metrics.inc_idle();
                return Offer::Skipped(SkipReason::Idle);
            }
            if self.is_duplicate(&slot.committed, &payload, now) {
                self.metrics.inc_deduplicated();
                return Offer::Skipped(SkipReason::Duplicate);
            }

            let body = match serde_json::to_value(&payload) {
                Ok(body) => body,
                Err(e) => {
                    warn!(channel = %P::CHANNEL, error = %e, "payload not serializable");
                    return Offer::Skipped(SkipReason::Unencodable);
                }
            };

            slot.in_flight = true;
            slot.last_attempt = Some(now);
            (payload, body)
        };

        let send = Self::send(
            self.slot.clone(),
            self.transport.clone(),
            self.url.clone(),
            self.retry,
            self.metrics.clone(),
            payload,
            body,
            sample.total_steps,
            now,
        );

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        let span = tracing::debug_span!("collector_send", channel = %P::CHANNEL);
        tasks.spawn(send.instrument(span));
        Offer::Started
    }

    fn is_duplicate(
        &self,
        committed: &DispatchState<P::Payload>,
        payload: &P::Payload,
        now: Instant,
    ) -> bool {
        match (&committed.last_payload, committed.last_send) {
            (Some(previous), Some(sent_at)) => {
                previous == payload && now.saturating_duration_since(sent_at) < self.dedup_window
            }
            _ => false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn send(
        slot: SharedSlot<P::Payload>,
        transport: Arc<T>,
        url: Arc<str>,
        retry: RetryPolicy,
        metrics: Arc<ChannelMetrics>,
        payload: P::Payload,
        body: serde_json::Value,
        total_steps: u64,
        started: Instant,
    ) {
        let result = send_with_retry(transport.as_ref(), &url, &body, retry, &metrics).await;

        let mut slot = lock(&slot);
        slot.in_flight = false;
        match result {
            Ok(attempts) => {
                let committed = &mut slot.committed;
                committed.last_send =
                    Some(committed.last_send.map_or(started, |t| t.max(started)));
                committed.last_payload = Some(payload);
                committed.baseline_steps = total_steps;
                metrics.inc_sent();
                observability::record_dispatch(P::CHANNEL, true);
                observability::record_dispatch_attempts(P::CHANNEL, attempts);
                info!(attempts, "payload delivered");
            }
            Err(e) => {
                metrics.inc_failed();
                observability::record_dispatch(P::CHANNEL, false);
                warn!(error = %e, "payload abandoned");
            }
        }
    }

    /// Wait for running sends until `deadline`. Returns `false` if some were
    /// still running (they are left to finish on their own).
    pub(crate) async fn drain(&self, deadline: Instant) -> bool {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        if tasks.is_empty() {
            return true;
        }

        let joined = tokio::time::timeout_at(deadline, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if joined.is_err() {
            debug!(channel = %P::CHANNEL, pending = tasks.len(), "grace period elapsed");
            tasks.detach_all();
            return false;
        }
        true
    }
}
