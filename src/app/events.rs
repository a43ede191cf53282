//! Outbound application events and per-poll records.
//!
//! The [`DetectorService`](super::service::DetectorService) emits
//! [`AppEvent`]s through the [`EventSink`](super::ports::EventSink) port
//! and one [`PollRecord`] per successful poll through the
//! [`RecordSink`](super::ports::RecordSink) port.

use serde::Serialize;

use crate::error::{ActuatorError, CallbackError, SensorError};
use crate::estimator::DetectionState;

/// Why a wanted alarm activation did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// The alarm is disabled.
    Disabled,
    /// The alarm is already sounding.
    AlreadyActive,
    /// The last activation is too recent.
    Cooldown { remaining_ms: u64 },
}

/// Structured events emitted by the detector core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The polling loop has started.
    Started,

    /// The polling loop has stopped.
    Stopped,

    /// The debounced detection state changed.
    StateChanged {
        from: DetectionState,
        to: DetectionState,
        at_ms: u64,
    },

    /// The alarm output was switched on.
    AlarmActivated { at_ms: u64 },

    /// The alarm output was switched off.
    AlarmDeactivated { at_ms: u64 },

    /// A wanted activation was blocked by policy.
    AlarmSuppressed { reason: SuppressReason, at_ms: u64 },

    /// A clear transition is waiting on strict deactivation conditions.
    DeactivationDeferred { at_ms: u64 },

    /// Driving the alarm output failed; alarm flags were rolled back.
    AlarmFault(ActuatorError),

    /// A sensor read failed.
    SensorFault {
        error: SensorError,
        consecutive: u32,
    },

    /// Consecutive read failures crossed the degraded threshold.
    SensorDegraded { consecutive: u32 },

    /// A read succeeded after one or more failures.
    SensorRecovered { after_failures: u32 },

    /// An observer callback failed (caught; the loop continues).
    ObserverFailed(CallbackError),
}

/// One line of the append-only reading log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PollRecord {
    /// Monotonic milliseconds since the detector clock started.
    pub timestamp_ms: u64,
    pub raw_reading: f32,
    pub stable_state: bool,
    /// `None` until the reading window has filled.
    pub window_average: Option<f32>,
    pub alarm_active: bool,
}
