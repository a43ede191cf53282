//! Port traits: the hexagonal boundary between detection logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DetectorService (domain)
//! ```
//!
//! Driven adapters (sensor inputs, the alarm output, event and record
//! sinks, config storage, clocks) implement these traits.  The
//! [`DetectorService`](super::service::DetectorService) consumes them via
//! generics, so the detection core never touches hardware directly.

use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;
use crate::error::{ActuatorError, ConfigError, SensorError};
use crate::sensors::Reading;

use super::events::{AppEvent, PollRecord};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Reading source: one raw reading per poll.
///
/// A failure is always treated as retryable by the polling loop.
pub trait SensorPort {
    fn read(&mut self) -> Result<Reading, SensorError>;
}

impl<T: SensorPort + ?Sized> SensorPort for Box<T> {
    fn read(&mut self) -> Result<Reading, SensorError> {
        (**self).read()
    }
}

// ───────────────────────────────────────────────────────────────
// Alarm port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Alarm flags as seen by readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlarmStatus {
    pub active: bool,
    pub enabled: bool,
    /// Incremented each time the alarm is disabled.  Lets the arbiter tell
    /// that a disable/re-enable cycle happened between two polls.
    pub disable_epoch: u32,
}

/// The alarm actuator.  Shared between the polling loop and external
/// readers, so every method takes `&self` and implementations serialise
/// access internally.
///
/// Invariant: `enabled == false` implies `active == false`.
pub trait AlarmPort: Send + Sync {
    /// Drive the alarm on.  `Ok(false)` if the alarm is disabled.
    fn activate(&self) -> Result<bool, ActuatorError>;

    /// Drive the alarm off.
    fn deactivate(&self) -> Result<bool, ActuatorError>;

    /// Flip the enabled flag and return the new value.  Disabling also
    /// deactivates the output.
    fn toggle_enabled(&self) -> bool;

    fn status(&self) -> AlarmStatus;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.  Adapters
/// decide where they go (log output, socket broadcast, ...).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn emit(&mut self, event: &AppEvent) {
        (**self).emit(event);
    }
}

/// Sink that drops every event.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

// ───────────────────────────────────────────────────────────────
// Record sink port (driven adapter: domain → append-only reading log)
// ───────────────────────────────────────────────────────────────

/// Receives one [`PollRecord`] per successful poll.
///
/// Fire-and-forget: implementations must not block the polling loop and
/// must swallow their own failures.
pub trait RecordSink {
    fn append(&mut self, record: &PollRecord);

    /// Records lost so far (full queue, failed writes).
    fn dropped(&self) -> u64 {
        0
    }
}

impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    fn append(&mut self, record: &PollRecord) {
        (**self).append(record);
    }

    fn dropped(&self) -> u64 {
        (**self).dropped()
    }
}

/// Sink that drops every record.
pub struct NullRecordSink;

impl RecordSink for NullRecordSink {
    fn append(&mut self, _record: &PollRecord) {}
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists detector configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`DetectorConfig::default()`] if no
    /// stored config exists.
    fn load(&self) -> Result<DetectorConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DetectorConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock used to timestamp samples.
pub trait Clock: Send {
    fn now_ms(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for Box<T> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
