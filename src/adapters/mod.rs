//! Adapter layer: concrete implementations of the port traits.
//!
//! | Adapter            | Port         |
//! |--------------------|--------------|
//! | `LogEventSink`     | `EventSink`  |
//! | `ReadingLog`       | `RecordSink` |
//! | `BackgroundRecordSink` | `RecordSink` |
//! | `JsonConfigFile`   | `ConfigPort` |
//! | `MonotonicClock`   | `Clock`      |
//!
//! Sensor and alarm adapters live in [`crate::sensors`] and
//! [`crate::drivers`], next to the hardware they wrap.

pub mod config_file;
pub mod log_sink;
pub mod record_log;
pub mod time;
