//! Host-side reading sources.
//!
//! [`SimulatedSensor`] is the development-mode fallback used when no real
//! input is wired: the level is injected from another thread through a
//! cloneable handle.  [`ScriptedSensor`] replays a fixed sequence of read
//! outcomes, which is what the scenario tests drive the loop with.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::app::ports::SensorPort;
use crate::error::SensorError;

use super::Reading;

/// Injected-level source.  Clones share the same level.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSensor {
    level_bits: Arc<AtomicU32>,
    digital: bool,
}

impl SimulatedSensor {
    /// Analog source starting at 0.0.
    pub fn analog() -> Self {
        Self::default()
    }

    /// Digital source: levels at or above 0.5 read as high.
    pub fn digital() -> Self {
        Self {
            digital: true,
            ..Self::default()
        }
    }

    pub fn set_level(&self, level: f32) {
        self.level_bits.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }
}

impl SensorPort for SimulatedSensor {
    fn read(&mut self) -> Result<Reading, SensorError> {
        let level = self.level();
        Ok(if self.digital {
            Reading::Digital(level >= 0.5)
        } else {
            Reading::Analog(level)
        })
    }
}

/// Replays a queue of read outcomes.  Once drained it either starts over
/// (`looping`) or reports [`SensorError::Exhausted`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    script: VecDeque<Result<Reading, SensorError>>,
    replay: Vec<Result<Reading, SensorError>>,
    looping: bool,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Result<Reading, SensorError>>) -> Self {
        let replay: Vec<_> = script.into_iter().collect();
        Self {
            script: replay.iter().copied().collect(),
            replay,
            looping: false,
        }
    }

    /// Successful analog readings only.
    pub fn from_levels(levels: impl IntoIterator<Item = f32>) -> Self {
        Self::new(levels.into_iter().map(|v| Ok(Reading::Analog(v))))
    }

    /// Successful digital readings only.
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        Self::new(bits.into_iter().map(|b| Ok(Reading::Digital(b))))
    }

    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SensorPort for ScriptedSensor {
    fn read(&mut self) -> Result<Reading, SensorError> {
        if self.script.is_empty() && self.looping {
            self.script.extend(self.replay.iter().copied());
        }
        self.script.pop_front().unwrap_or(Err(SensorError::Exhausted))
    }
}
