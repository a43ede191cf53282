//! Smoke sensor input: reading types and the concrete reading sources.
//!
//! Every source implements [`SensorPort`](crate::app::ports::SensorPort)
//! and produces one [`Reading`] per poll.  The polling loop stamps it with
//! the monotonic clock to form a [`Sample`].
//!
//! | Source              | Hardware                                 |
//! |---------------------|------------------------------------------|
//! | `DigitalSmokeSensor`| any `embedded_hal` input pin             |
//! | `AnalogSmokeSensor` | ADC channel with two-point calibration   |
//! | `ScriptedSensor`    | replayed sequence (tests, demos)         |
//! | `SimulatedSensor`   | injected value (development mode)        |

pub mod analog;
pub mod digital;
pub mod simulated;

use serde::{Deserialize, Serialize};

pub use analog::{AnalogSmokeSensor, Calibration};
pub use digital::DigitalSmokeSensor;
pub use simulated::{ScriptedSensor, SimulatedSensor};

/// One raw reading from the smoke sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    /// Digital detector output (`true` = smoke signalled).
    Digital(bool),
    /// Normalised analog level in [0, 1].
    Analog(f32),
}

impl Reading {
    /// The reading as a scalar in [0, 1].  Out-of-range analog values are
    /// clamped and NaN maps to 0.0 so the filter never sees a non-finite.
    pub fn value(self) -> f32 {
        match self {
            Self::Digital(true) => 1.0,
            Self::Digital(false) => 0.0,
            Self::Analog(v) if v.is_nan() => 0.0,
            Self::Analog(v) => v.clamp(0.0, 1.0),
        }
    }
}

/// A timestamped raw reading.  Immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Monotonic capture time in milliseconds.
    pub timestamp_ms: u64,
    pub reading: Reading,
}

impl Sample {
    pub fn new(timestamp_ms: u64, reading: Reading) -> Self {
        Self {
            timestamp_ms,
            reading,
        }
    }

    /// Shorthand for an analog sample.
    pub fn analog(timestamp_ms: u64, level: f32) -> Self {
        Self::new(timestamp_ms, Reading::Analog(level))
    }

    /// Shorthand for a digital sample.
    pub fn digital(timestamp_ms: u64, high: bool) -> Self {
        Self::new(timestamp_ms, Reading::Digital(high))
    }

    pub fn value(&self) -> f32 {
        self.reading.value()
    }
}
