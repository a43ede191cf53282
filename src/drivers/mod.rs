//! Actuator drivers and task helpers.

pub mod alarm;
pub mod task_pin;

pub use alarm::{AlarmOutput, SimPin};
