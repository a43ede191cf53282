//! Application core: detection logic behind port traits.
//!
//! This module contains the rules that turn raw readings into alarm
//! decisions: the per-poll service, observer fan-out, the data history,
//! and the status snapshot.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod history;
pub mod observers;
pub mod ports;
pub mod service;
pub mod status;
