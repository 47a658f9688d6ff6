//! Dispatcher - relays samples to the remote collector on two channels

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    CollectorConfig, DispatchConfig, MetricChannel, MovementPayload, RelayBlueprint, Sample,
    SampleRelay, VitalPayload,
};
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::channel::{ChannelDispatcher, Offer};
use crate::error::DispatchError;
use crate::metrics::{DispatchMetrics, DispatchSnapshot};
use crate::policy::{
    local_clock, DispatchState, MovementPolicy, StepFormulas, VitalPolicy, WallClock,
};
use crate::retry::StatusClass;
use crate::transport::{CollectorTransport, HttpTransport};

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder<T> {
    collector: CollectorConfig,
    dispatch: DispatchConfig,
    formulas: StepFormulas,
    clock: WallClock,
    transport: T,
}

impl DispatcherBuilder<HttpTransport> {
    /// HTTP dispatcher configured from a blueprint
    pub fn from_blueprint(blueprint: &RelayBlueprint) -> Result<Self, DispatchError> {
        Ok(Self::new(
            blueprint.collector.clone(),
            blueprint.dispatch.clone(),
            HttpTransport::new()?,
        )
        .formulas(StepFormulas::linear(&blueprint.formulas)))
    }
}

impl<T> DispatcherBuilder<T>
where
    T: CollectorTransport + Sync + 'static,
{
    pub fn new(collector: CollectorConfig, dispatch: DispatchConfig, transport: T) -> Self {
        Self {
            collector,
            dispatch,
            formulas: StepFormulas::default(),
            clock: local_clock(),
            transport,
        }
    }

    /// Replace the step conversions
    pub fn formulas(mut self, formulas: StepFormulas) -> Self {
        self.formulas = formulas;
        self
    }

    /// Replace the wall clock used for vital timestamps
    pub fn clock(mut self, clock: WallClock) -> Self {
        self.clock = clock;
        self
    }

    /// Build the dispatcher. The session starts now.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(collector = %self.collector.base_url)
    )]
    pub fn build(self) -> Dispatcher<T> {
        let transport = Arc::new(self.transport);
        let metrics = Arc::new(DispatchMetrics::new());
        let session_start = Instant::now();

        let movement = ChannelDispatcher::new(
            MovementPolicy {
                formulas: self.formulas,
                session: self.collector.session,
                session_start,
                send_zero_movement: self.dispatch.send_zero_movement,
            },
            transport.clone(),
            self.collector.endpoint(MetricChannel::Movement),
            &self.dispatch,
            metrics.movement.clone(),
        );
        let vital = ChannelDispatcher::new(
            VitalPolicy {
                pressure: self.collector.pressure.clone(),
                session: self.collector.session,
                clock: self.clock,
            },
            transport,
            self.collector.endpoint(MetricChannel::Vital),
            &self.dispatch,
            metrics.vital.clone(),
        );

        info!(
            movement = movement.url(),
            vital = vital.url(),
            rate_interval_ms = self.dispatch.rate_interval_ms,
            "dispatcher ready"
        );

        Dispatcher {
            movement,
            vital,
            metrics,
        }
    }
}

/// What happened to one sample on each channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub movement: Offer,
    pub vital: Offer,
}

/// Per-channel dispatch with rate gate, dedup and bounded retry
///
/// Sends run on spawned tasks; `dispatch` must be called from within a tokio
/// runtime and never waits on the network.
pub struct Dispatcher<T> {
    movement: ChannelDispatcher<MovementPolicy, T>,
    vital: ChannelDispatcher<VitalPolicy, T>,
    metrics: Arc<DispatchMetrics>,
}

impl<T> Dispatcher<T>
where
    T: CollectorTransport + Sync + 'static,
{
    /// Offer a sample to both channels
    pub fn dispatch(&self, sample: &Sample) -> DispatchOutcome {
        DispatchOutcome {
            movement: self.movement.offer(sample),
            vital: self.vital.offer(sample),
        }
    }

    /// Get metrics for both channels
    pub fn metrics(&self) -> DispatchSnapshot {
        self.metrics.snapshot()
    }

    /// Shared metrics handle, for reporters
    pub fn metrics_handle(&self) -> Arc<DispatchMetrics> {
        self.metrics.clone()
    }

    pub fn movement_state(&self) -> DispatchState<MovementPayload> {
        self.movement.state()
    }

    pub fn vital_state(&self) -> DispatchState<VitalPayload> {
        self.vital.state()
    }

    pub fn endpoint(&self, channel: MetricChannel) -> &str {
        match channel {
            MetricChannel::Movement => self.movement.url(),
            MetricChannel::Vital => self.vital.url(),
        }
    }

    /// Wait up to `grace` for in-flight sends
    ///
    /// Returns `true` if every send finished in time.
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        let (movement, vital) =
            tokio::join!(self.movement.drain(deadline), self.vital.drain(deadline));

        let complete = movement && vital;
        if complete {
            info!(metrics = ?self.metrics(), "dispatcher drained");
        } else {
            warn!(
                movement_done = movement,
                vital_done = vital,
                "shutdown grace elapsed with sends in flight"
            );
        }
        complete
    }
}

impl<T> SampleRelay for Dispatcher<T>
where
    T: CollectorTransport + Sync + 'static,
{
    fn offer(&self, sample: &Sample) {
        self.dispatch(sample);
    }
}

/// GET the movement endpoint once; only a 2xx answer counts as ready
///
/// # Errors
/// `Transient` when the collector cannot be reached in time, `Rejected` when
/// it answers with any other status.
#[instrument(name = "dispatcher_check_collector", skip(transport, collector))]
pub async fn check_collector<T: CollectorTransport>(
    transport: &T,
    collector: &CollectorConfig,
    timeout: Duration,
) -> Result<u16, DispatchError> {
    let url = collector.endpoint(MetricChannel::Movement);
    match tokio::time::timeout(timeout, transport.get(&url)).await {
        Ok(Ok(status)) if StatusClass::of(status) == StatusClass::Success => Ok(status),
        Ok(Ok(status)) => Err(DispatchError::Rejected { status }),
        Ok(Err(e)) => Err(DispatchError::transient(1, e.to_string())),
        Err(_) => Err(DispatchError::transient(
            1,
            format!("no response within {timeout:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use serde_json::Value;

    use super::*;
    use crate::channel::SkipReason;
    use crate::error::TransportError;

    /// Records every POST. Movement replies come from a script, then 200;
    /// vitals always get 200.
    #[derive(Default)]
    struct FakeCollector {
        posts: Mutex<Vec<(String, Value)>>,
        replies: Mutex<VecDeque<u16>>,
        latency: Duration,
        get_status: Option<u16>,
    }

    impl FakeCollector {
        fn replying(replies: &[u16]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().copied().collect()),
                ..Default::default()
            }
        }

        fn posts_to(&self, suffix: &str) -> Vec<Value> {
            self.posts
                .lock()
                .unwrap()
                .iter()
                .filter(|(url, _)| url.ends_with(suffix))
                .map(|(_, body)| body.clone())
                .collect()
        }
    }

    impl CollectorTransport for Arc<FakeCollector> {
        async fn post_json(&self, url: &str, body: &Value) -> Result<u16, TransportError> {
            self.posts
                .lock()
                .unwrap()
                .push((url.to_string(), body.clone()));
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if !url.contains("caminata") {
                return Ok(200);
            }
            let status = self.replies.lock().unwrap().pop_front().unwrap_or(200);
            Ok(status)
        }

        async fn get(&self, _url: &str) -> Result<u16, TransportError> {
            Ok(self.get_status.unwrap_or(200))
        }
    }

    fn build(
        collector: Arc<FakeCollector>,
        dispatch: DispatchConfig,
    ) -> Dispatcher<Arc<FakeCollector>> {
        let fixed = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(8, 30, 5))
            .unwrap();
        DispatcherBuilder::new(CollectorConfig::default(), dispatch, collector)
            .clock(Arc::new(move || fixed))
            .build()
    }

    fn sample(steps: u64, spo2: f64, heart_rate: u32) -> Sample {
        Sample {
            total_steps: steps,
            spo2,
            heart_rate,
            ..Default::default()
        }
    }

    /// Let spawned sends run to completion under paused time
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_gate_per_channel() {
        let collector = Arc::new(FakeCollector::default());
        let dispatcher = build(collector.clone(), DispatchConfig::default());

        let first = dispatcher.dispatch(&sample(10, 97.0, 70));
        assert_eq!(first.movement, Offer::Started);
        assert_eq!(first.vital, Offer::Started);
        settle().await;

        tokio::time::advance(Duration::from_secs(1)).await;
        let second = dispatcher.dispatch(&sample(12, 97.0, 71));
        assert_eq!(second.movement, Offer::Skipped(SkipReason::RateLimited));
        assert_eq!(second.vital, Offer::Skipped(SkipReason::RateLimited));

        tokio::time::advance(Duration::from_millis(2100)).await;
        let third = dispatcher.dispatch(&sample(15, 96.0, 72));
        assert_eq!(third.movement, Offer::Started);
        settle().await;

        assert_eq!(collector.posts_to("/metrics/caminata/").len(), 2);
        assert_eq!(collector.posts_to("/metrics/corazon/").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_baseline_advances_only_on_success() {
        let collector = Arc::new(FakeCollector::default());
        let dispatcher = build(collector.clone(), DispatchConfig::default());

        dispatcher.dispatch(&sample(100, 0.0, 0));
        settle().await;
        assert_eq!(dispatcher.movement_state().baseline_steps, 100);

        tokio::time::advance(Duration::from_secs(3)).await;
        dispatcher.dispatch(&sample(150, 0.0, 0));
        settle().await;

        let posts = collector.posts_to("/metrics/caminata/");
        assert_eq!(posts[1]["pasos"], 50);
        assert_eq!(posts[1]["km_recorridos"], "0.04");
        assert_eq!(posts[1]["calorias_quemadas"], "2.0");
        assert_eq!(posts[1]["sesion"], 1);
        assert_eq!(dispatcher.movement_state().baseline_steps, 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_keeps_state() {
        let collector = Arc::new(FakeCollector::replying(&[404]));
        let dispatcher = build(collector.clone(), DispatchConfig::default());

        dispatcher.dispatch(&sample(100, 95.0, 60));
        settle().await;

        let state = dispatcher.movement_state();
        assert_eq!(state.baseline_steps, 0);
        assert!(state.last_send.is_none());
        assert!(state.last_payload.is_none());
        assert_eq!(dispatcher.metrics().movement.failed, 1);

        // next send still counts from the old baseline
        tokio::time::advance(Duration::from_secs(3)).await;
        dispatcher.dispatch(&sample(150, 95.0, 60));
        settle().await;
        assert_eq!(collector.posts_to("/metrics/caminata/")[1]["pasos"], 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dedup_within_window() {
        let collector = Arc::new(FakeCollector::default());
        let dispatch = DispatchConfig {
            rate_interval_ms: 500,
            ..Default::default()
        };
        let dispatcher = build(collector.clone(), dispatch);

        assert_eq!(dispatcher.dispatch(&sample(0, 98.0, 75)).vital, Offer::Started);
        settle().await;

        // same vitals, same clock second, inside 1.5 s
        tokio::time::advance(Duration::from_millis(600)).await;
        let again = dispatcher.dispatch(&sample(0, 98.0, 75));
        assert_eq!(again.vital, Offer::Skipped(SkipReason::Duplicate));

        // past the window the identical payload goes out
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(dispatcher.dispatch(&sample(0, 98.0, 75)).vital, Offer::Started);
        settle().await;

        assert_eq!(collector.posts_to("/metrics/corazon/").len(), 2);
        assert_eq!(dispatcher.metrics().vital.deduplicated, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_while_retrying() {
        let collector = Arc::new(FakeCollector::replying(&[503, 503, 200]));
        let dispatcher = build(collector.clone(), DispatchConfig::default());

        dispatcher.dispatch(&sample(10, 0.0, 0));
        settle().await;

        // rate interval passed, first send still between retries
        tokio::time::advance(Duration::from_millis(3500)).await;
        let busy = dispatcher.dispatch(&sample(20, 0.0, 0));
        assert_eq!(busy.movement, Offer::Skipped(SkipReason::InFlight));

        assert!(dispatcher.shutdown(Duration::from_secs(6)).await);
        assert_eq!(dispatcher.movement_state().baseline_steps, 10);
        assert_eq!(dispatcher.metrics().movement.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_movement_toggle() {
        let collector = Arc::new(FakeCollector::default());
        let dispatch = DispatchConfig {
            send_zero_movement: false,
            ..Default::default()
        };
        let dispatcher = build(collector.clone(), dispatch);

        let outcome = dispatcher.dispatch(&sample(0, 97.0, 70));
        assert_eq!(outcome.movement, Offer::Skipped(SkipReason::Idle));
        assert_eq!(outcome.vital, Offer::Started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vital_payload_on_wire() {
        let collector = Arc::new(FakeCollector::default());
        let dispatcher = build(collector.clone(), DispatchConfig::default());

        dispatcher.dispatch(&sample(0, 96.456, 81));
        settle().await;

        let body = &collector.posts_to("/metrics/corazon/")[0];
        assert_eq!(body["ritmo_cardiaco"], 81);
        assert_eq!(body["presion"], "120/80");
        assert_eq!(body["oxigenacion"], "96.46");
        assert_eq!(body["fecha"], "2024-05-01");
        assert_eq!(body["hora"], "08:30:05");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_grace_elapses() {
        let collector = Arc::new(FakeCollector {
            latency: Duration::from_secs(60),
            ..Default::default()
        });
        let dispatch = DispatchConfig {
            attempt_timeout_ms: 120_000,
            ..Default::default()
        };
        let dispatcher = build(collector, dispatch);

        dispatcher.dispatch(&sample(5, 97.0, 70));
        assert!(!dispatcher.shutdown(Duration::from_secs(6)).await);
    }

    #[tokio::test]
    async fn test_check_collector_reports_status() {
        let collector = Arc::new(FakeCollector::default());
        let config = CollectorConfig::default();
        let status = check_collector(&collector, &config, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_check_collector_rejects_non_success_status() {
        let config = CollectorConfig::default();
        for answer in [404, 405, 500] {
            let collector = Arc::new(FakeCollector {
                get_status: Some(answer),
                ..Default::default()
            });
            let err = check_collector(&collector, &config, Duration::from_secs(1))
                .await
                .unwrap_err();
            assert!(matches!(err, DispatchError::Rejected { status } if status == answer));
            assert!(!err.is_retryable());
        }
    }
}
