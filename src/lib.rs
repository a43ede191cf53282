//! SmokeWatch detector library.
//!
//! Debounces a noisy smoke sensor into a stable smoke/clear state and
//! drives an alarm output with cooldown and enable gating.  Exposes the
//! pure-logic modules for integration testing; all ESP-IDF-specific code
//! is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod arbiter;
pub mod config;
pub mod detector;
pub mod diagnostics;
pub mod error;
pub mod estimator;
pub mod signal;

pub mod adapters;
pub mod drivers;
pub mod sensors;

pub use config::DetectorConfig;
pub use detector::{Detector, DetectorHandle};
pub use error::{Error, Result};
