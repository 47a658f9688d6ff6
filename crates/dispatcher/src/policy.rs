//! Payload derivation per metric channel
//!
//! A policy turns the latest sample plus the channel's committed state into
//! the payload the collector would receive. Derivation is pure: state only
//! changes after a successful send.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use contracts::{
    decimal_string, FormulaConfig, MetricChannel, MovementPayload, Sample, VitalPayload,
};
use serde::Serialize;
use tokio::time::Instant;

/// `fn(steps) -> value` conversion
pub type StepFormula = Arc<dyn Fn(u64) -> f64 + Send + Sync>;

/// Local wall clock used for vital timestamps
pub type WallClock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// System local time
pub fn local_clock() -> WallClock {
    Arc::new(|| chrono::Local::now().naive_local())
}

/// Step to distance/calorie conversions
#[derive(Clone)]
pub struct StepFormulas {
    distance_km: StepFormula,
    calories_kcal: StepFormula,
}

impl StepFormulas {
    pub fn new(
        distance_km: impl Fn(u64) -> f64 + Send + Sync + 'static,
        calories_kcal: impl Fn(u64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            distance_km: Arc::new(distance_km),
            calories_kcal: Arc::new(calories_kcal),
        }
    }

    /// Constant factor per step
    pub fn linear(config: &FormulaConfig) -> Self {
        let FormulaConfig {
            km_per_step,
            kcal_per_step,
        } = *config;
        Self::new(
            move |steps| steps as f64 * km_per_step,
            move |steps| steps as f64 * kcal_per_step,
        )
    }

    pub fn distance_km(&self, steps: u64) -> f64 {
        (self.distance_km)(steps)
    }

    pub fn calories_kcal(&self, steps: u64) -> f64 {
        (self.calories_kcal)(steps)
    }
}

impl Default for StepFormulas {
    fn default() -> Self {
        Self::linear(&FormulaConfig::default())
    }
}

impl fmt::Debug for StepFormulas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepFormulas").finish_non_exhaustive()
    }
}

/// Committed state of one channel
///
/// Written only when a send succeeds.
#[derive(Debug, Clone)]
pub struct DispatchState<P> {
    /// Start of the last successful attempt
    pub last_send: Option<Instant>,
    /// Payload of the last successful attempt
    pub last_payload: Option<P>,
    /// Step total of the sample behind the last success
    pub baseline_steps: u64,
}

impl<P> Default for DispatchState<P> {
    fn default() -> Self {
        Self {
            last_send: None,
            last_payload: None,
            baseline_steps: 0,
        }
    }
}

/// Channel-specific payload rules
pub trait PayloadPolicy: Send + Sync + 'static {
    type Payload: Serialize + Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    const CHANNEL: MetricChannel;

    fn derive(
        &self,
        sample: &Sample,
        state: &DispatchState<Self::Payload>,
        now: Instant,
    ) -> Self::Payload;

    /// Payloads that should not be sent at all
    fn is_idle(&self, _payload: &Self::Payload) -> bool {
        false
    }
}

/// Steps, distance and calories since the last success
#[derive(Debug, Clone)]
pub struct MovementPolicy {
    pub formulas: StepFormulas,
    pub session: u32,
    pub session_start: Instant,
    pub send_zero_movement: bool,
}

impl MovementPolicy {
    /// New steps relative to the baseline. A total below the baseline means
    /// the device restarted its counter, so the whole total is new.
    pub fn new_steps(total: u64, baseline: u64) -> u64 {
        total.checked_sub(baseline).unwrap_or(total)
    }
}

impl PayloadPolicy for MovementPolicy {
    type Payload = MovementPayload;

    const CHANNEL: MetricChannel = MetricChannel::Movement;

    fn derive(
        &self,
        sample: &Sample,
        state: &DispatchState<MovementPayload>,
        now: Instant,
    ) -> MovementPayload {
        let steps = Self::new_steps(sample.total_steps, state.baseline_steps);
        let km = self.formulas.distance_km(steps);
        let kcal = self.formulas.calories_kcal(steps);

        let window_start = state.last_send.unwrap_or(self.session_start);
        let window_hours = now.saturating_duration_since(window_start).as_secs_f64() / 3600.0;
        let speed = if window_hours > 0.0 {
            km / window_hours
        } else {
            0.0
        };

        MovementPayload {
            distance_km: decimal_string(km, 4),
            steps,
            active_time: now
                .saturating_duration_since(self.session_start)
                .as_secs()
                .to_string(),
            average_speed: decimal_string(speed, 2),
            calories: decimal_string(kcal, 2),
            session: self.session,
        }
    }

    fn is_idle(&self, payload: &MovementPayload) -> bool {
        !self.send_zero_movement && payload.is_idle()
    }
}

/// Heart rate and oxygenation with a local timestamp
#[derive(Clone)]
pub struct VitalPolicy {
    pub pressure: String,
    pub session: u32,
    pub clock: WallClock,
}

impl fmt::Debug for VitalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VitalPolicy")
            .field("pressure", &self.pressure)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl PayloadPolicy for VitalPolicy {
    type Payload = VitalPayload;

    const CHANNEL: MetricChannel = MetricChannel::Vital;

    fn derive(
        &self,
        sample: &Sample,
        _state: &DispatchState<VitalPayload>,
        _now: Instant,
    ) -> VitalPayload {
        let local = (self.clock)();
        VitalPayload {
            heart_rate: sample.heart_rate,
            pressure: self.pressure.clone(),
            oxygenation: decimal_string(sample.spo2, 2),
            date: local.format("%Y-%m-%d").to_string(),
            time: local.format("%H:%M:%S").to_string(),
            session: self.session,
        }
    }
}
