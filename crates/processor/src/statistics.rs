//! Running statistics
//!
//! Written by the processor, read by reporters at any time. A single mutex
//! guards all fields so a snapshot is never torn.

use std::sync::{Mutex, PoisonError};

use contracts::Sample;
use serde::Serialize;

#[derive(Debug, Default)]
struct Totals {
    samples: u64,
    max_spo2: Option<f64>,
    min_spo2: Option<f64>,
    last_total_steps: u64,
}

/// Aggregates over every decoded sample
#[derive(Debug, Default)]
pub struct Statistics {
    totals: Mutex<Totals>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample in. Zero SpO2 readings do not affect max/min.
    pub fn record(&self, sample: &Sample) {
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        totals.samples += 1;
        totals.last_total_steps = sample.total_steps;

        if sample.has_spo2() {
            let spo2 = sample.spo2;
            totals.max_spo2 = Some(totals.max_spo2.map_or(spo2, |max| max.max(spo2)));
            totals.min_spo2 = Some(totals.min_spo2.map_or(spo2, |min| min.min(spo2)));
        }
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        StatisticsSnapshot {
            samples: totals.samples,
            max_spo2: totals.max_spo2,
            min_spo2: totals.min_spo2,
            last_total_steps: totals.last_total_steps,
        }
    }
}

/// Consistent point-in-time copy of `Statistics`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub samples: u64,
    /// Highest non-zero SpO2 seen
    pub max_spo2: Option<f64>,
    /// Lowest non-zero SpO2 seen
    pub min_spo2: Option<f64>,
    /// Step total of the latest sample
    pub last_total_steps: u64,
}

impl StatisticsSnapshot {
    /// Midpoint of the SpO2 range, the figure the end-of-run report has
    /// always shown
    pub fn estimated_average_spo2(&self) -> Option<f64> {
        match (self.max_spo2, self.min_spo2) {
            (Some(max), Some(min)) => Some((max + min) / 2.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(spo2: f64, steps: u64) -> Sample {
        Sample {
            spo2,
            total_steps: steps,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_readings_ignored_for_range() {
        let stats = Statistics::new();
        for (spo2, steps) in [(97.0, 10), (0.0, 12), (92.5, 15), (99.0, 20)] {
            stats.record(&sample(spo2, steps));
        }

        let snap = stats.snapshot();
        assert_eq!(snap.samples, 4);
        assert_eq!(snap.max_spo2, Some(99.0));
        assert_eq!(snap.min_spo2, Some(92.5));
        assert_eq!(snap.last_total_steps, 20);
        assert_eq!(snap.estimated_average_spo2(), Some(95.75));
    }

    #[test]
    fn test_no_readings() {
        let stats = Statistics::new();
        stats.record(&sample(0.0, 3));
        let snap = stats.snapshot();
        assert_eq!(snap.samples, 1);
        assert_eq!(snap.max_spo2, None);
        assert_eq!(snap.estimated_average_spo2(), None);
    }

    #[test]
    fn test_concurrent_snapshots_consistent() {
        use std::sync::Arc;

        let stats = Arc::new(Statistics::new());
        let writer = {
            let stats = stats.clone();
            std::thread::spawn(move || {
                for i in 1..=1000u64 {
                    stats.record(&sample(90.0 + (i % 10) as f64, i));
                }
            })
        };

        for _ in 0..200 {
            let snap = stats.snapshot();
            if let (Some(max), Some(min)) = (snap.max_spo2, snap.min_spo2) {
                assert!(min <= max);
            }
            // steps are the sample index, so they track the count exactly
            assert_eq!(snap.samples, snap.last_total_steps);
        }
        writer.join().unwrap();
        assert_eq!(stats.snapshot().samples, 1000);
    }
}
