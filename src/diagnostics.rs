//! Sensor health tracking and runtime metrics.
//!
//! [`SensorHealth`] turns a run of read failures into a distinguishable
//! "degraded" flag, so a dead sensor never masquerades as a clean
//! `smoke_detected = false`.  [`RuntimeMetrics`] are plain counters the
//! loop bumps and the status query copies out.

use serde::Serialize;

use crate::error::SensorError;

/// What a single read outcome did to the health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthChange {
    /// No externally visible change.
    Unchanged,
    /// This failure crossed the degraded threshold.
    BecameDegraded,
    /// A success after `after_failures` consecutive failures.
    Recovered { after_failures: u32 },
}

#[derive(Debug, Clone)]
pub struct SensorHealth {
    degraded_after: u32,
    consecutive_failures: u32,
    last_error: Option<SensorError>,
}

impl SensorHealth {
    pub fn new(degraded_after: u32) -> Self {
        Self {
            degraded_after: degraded_after.max(1),
            consecutive_failures: 0,
            last_error: None,
        }
    }

    pub fn record_failure(&mut self, error: SensorError) -> HealthChange {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error);
        if self.consecutive_failures == self.degraded_after {
            HealthChange::BecameDegraded
        } else {
            HealthChange::Unchanged
        }
    }

    pub fn record_success(&mut self) -> HealthChange {
        let failures = core::mem::take(&mut self.consecutive_failures);
        self.last_error = None;
        if failures > 0 {
            HealthChange::Recovered {
                after_failures: failures,
            }
        } else {
            HealthChange::Unchanged
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures >= self.degraded_after
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Error of the current failure run, cleared by the next success.
    pub fn last_error(&self) -> Option<SensorError> {
        self.last_error
    }
}

/// Counters collected over the lifetime of one detector run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeMetrics {
    pub polls: u64,
    pub read_failures: u64,
    pub transitions: u64,
    pub alarm_activations: u64,
    pub suppressed_activations: u64,
    pub actuator_faults: u64,
    pub observer_failures: u64,
    pub dropped_records: u64,
}
