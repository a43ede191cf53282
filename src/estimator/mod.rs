//! State estimator: turns raw samples into a debounced smoke/clear state.
//!
//! ```text
//!  Sample ──▶ ReadingWindow ──(full?)──▶ NoiseFilter ──▶ filtered
//!                              │                            │
//!                              └──▶ window average          ▼
//!                                        │          ┌──────────────┐
//!                                        └────────▶ │    Policy    │ ──▶ Option<StateChange>
//!                                                   │  A: duration │
//!                                                   │  B: counting │
//!                                                   └──────────────┘
//! ```
//!
//! Policy A consumes the filtered value, Policy B the plain window average;
//! both values are computed on every evaluated poll so status reporting is
//! identical regardless of policy.
//!
//! Nothing is evaluated until the window is full (cold-start gate).  The
//! estimator reads time only from sample timestamps, so replaying the same
//! sample sequence through a fresh estimator yields the same transitions.

pub mod counting;
pub mod duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{DetectorConfig, EstimatorPolicy};
use crate::sensors::Sample;
use crate::signal::{NoiseFilter, ReadingWindow};
use counting::CountingEstimator;
use duration::DurationEstimator;

// ---------------------------------------------------------------------------
// Detection state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    #[default]
    Clear,
    Smoke,
}

impl DetectionState {
    pub fn is_smoke(self) -> bool {
        matches!(self, Self::Smoke)
    }
}

impl From<bool> for DetectionState {
    fn from(smoke: bool) -> Self {
        if smoke { Self::Smoke } else { Self::Clear }
    }
}

/// A single applied transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange {
    pub from: DetectionState,
    pub to: DetectionState,
    /// Timestamp of the sample that caused the change.
    pub at_ms: u64,
    pub filtered: f32,
    pub window_average: f32,
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

enum Policy {
    Duration(DurationEstimator),
    Counting(CountingEstimator),
}

pub struct StateEstimator {
    window: ReadingWindow,
    filter: NoiseFilter,
    policy: Policy,
    state: DetectionState,
    last_filtered: Option<f32>,
    last_average: Option<f32>,
}

impl StateEstimator {
    pub fn new(config: &DetectorConfig) -> Self {
        let policy = match config.policy {
            EstimatorPolicy::Duration(p) => Policy::Duration(DurationEstimator::new(p)),
            EstimatorPolicy::Counting(p) => Policy::Counting(CountingEstimator::new(p)),
        };
        Self {
            window: ReadingWindow::new(config.window_capacity),
            filter: NoiseFilter::new(config.filter.alpha, config.filter.history_len),
            policy,
            state: DetectionState::Clear,
            last_filtered: None,
            last_average: None,
        }
    }

    /// Feed one sample.  Emits at most one transition per call.
    pub fn observe(&mut self, sample: Sample) -> Option<StateChange> {
        self.window.push(sample);
        if !self.window.is_full() {
            return None;
        }

        let filtered = self.filter.apply(&self.window);
        let average = self.window.average().unwrap_or(0.0);
        self.last_filtered = Some(filtered);
        self.last_average = Some(average);

        let now_ms = sample.timestamp_ms;
        let next = match &mut self.policy {
            Policy::Duration(p) => p.evaluate(filtered, now_ms, self.state),
            Policy::Counting(p) => p.evaluate(average, self.state),
        }?;

        let change = StateChange {
            from: self.state,
            to: next,
            at_ms: now_ms,
            filtered,
            window_average: average,
        };
        self.state = next;
        info!(
            "estimator: {:?} -> {:?} at {} ms (filtered={:.3}, avg={:.3})",
            change.from, change.to, now_ms, filtered, average
        );
        Some(change)
    }

    pub fn current_state(&self) -> DetectionState {
        self.state
    }

    pub fn is_smoke(&self) -> bool {
        self.state.is_smoke()
    }

    /// Output of the most recent filter pass.
    pub fn filtered_value(&self) -> Option<f32> {
        self.last_filtered
    }

    /// Window average at the most recent evaluated poll.
    pub fn window_average(&self) -> Option<f32> {
        self.last_average
    }

    pub fn window(&self) -> &ReadingWindow {
        &self.window
    }

    /// Policy B confirmation counter; `None` under Policy A.
    pub fn confirmation_count(&self) -> Option<u16> {
        match &self.policy {
            Policy::Counting(p) => Some(p.stable_count()),
            Policy::Duration(_) => None,
        }
    }

    /// Policy A trigger-start timestamp; `None` when unarmed or under Policy B.
    pub fn trigger_start_ms(&self) -> Option<u64> {
        match &self.policy {
            Policy::Duration(p) => p.trigger_start_ms(),
            Policy::Counting(_) => None,
        }
    }

    /// True when no confirmation progress toward smoke is pending: the
    /// counter is at zero (Policy B) or the trigger is disarmed (Policy A).
    pub fn at_confirmation_floor(&self) -> bool {
        match &self.policy {
            Policy::Counting(p) => p.stable_count() == 0,
            Policy::Duration(p) => p.trigger_start_ms().is_none(),
        }
    }
}
