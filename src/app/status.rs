//! Status snapshot served to external readers.

use serde::Serialize;

use crate::diagnostics::RuntimeMetrics;

/// Point-in-time view of the detector.
///
/// `smoke_detected` is `None` while the sensor is degraded, so a dead
/// sensor is never reported as a clean `false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorStatus {
    pub running: bool,
    pub smoke_detected: Option<bool>,
    /// Output of the most recent filter pass; `None` before the window fills.
    pub filtered_value: Option<f32>,
    /// Current window contents, oldest first.
    pub raw_readings: Vec<f32>,
    pub window_average: Option<f32>,
    pub alarm_active: bool,
    pub alarm_enabled: bool,
    pub sensor_degraded: bool,
    pub consecutive_failures: u32,
    /// Last read error of the current failure run.
    pub error: Option<String>,
    pub last_trigger_ms: Option<u64>,
    pub metrics: RuntimeMetrics,
}

impl Default for DetectorStatus {
    fn default() -> Self {
        Self {
            running: false,
            smoke_detected: Some(false),
            filtered_value: None,
            raw_readings: Vec::new(),
            window_average: None,
            alarm_active: false,
            alarm_enabled: true,
            sensor_degraded: false,
            consecutive_failures: 0,
            error: None,
            last_trigger_ms: None,
            metrics: RuntimeMetrics::default(),
        }
    }
}
