//! Detector configuration parameters
//!
//! All tunable parameters for the smoke detector.  Values can be overridden
//! via a JSON config file (see `adapters::config_file`).  Every config is
//! range-checked by [`DetectorConfig::validate`] before the polling loop
//! starts; a failure there is the only fatal error in the system.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::signal::{MAX_HISTORY, MAX_WINDOW, MIN_WINDOW};

/// Highest GPIO number accepted for either pin.
pub const MAX_GPIO: i32 = 48;

/// How the sensor input pin is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Digital detector output, one bit per poll.
    Digital,
    /// Analog detector output through an ADC channel, normalised to [0, 1].
    Analog,
}

/// Parameters of the three-stage noise filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Exponential smoothing weight of the newest median (0 < alpha <= 1).
    pub alpha: f32,
    /// Number of previous filtered values retained for smoothing continuity.
    pub history_len: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            history_len: 5,
        }
    }
}

/// Policy A: threshold with hysteresis plus a minimum trigger duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationPolicy {
    /// Filtered value at or above which the trigger timer starts.
    pub trigger_threshold: f32,
    /// Filtered value at or below which the state clears.
    pub clear_threshold: f32,
    /// How long the trigger must stay armed before smoke is declared.
    pub min_trigger_duration_ms: u32,
    /// Minimum spacing between two applied state changes.
    pub state_change_cooldown_ms: u32,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            trigger_threshold: 0.7,
            clear_threshold: 0.3,
            min_trigger_duration_ms: 500,
            state_change_cooldown_ms: 1000,
        }
    }
}

/// Policy B: consecutive-confirmation counting on the window average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountingPolicy {
    /// Window average at or above which the counter increments.
    pub high_threshold: f32,
    /// Window average at or below which the counter decrements.
    pub low_threshold: f32,
    /// Counter value required to declare smoke.
    pub stable_count_required: u16,
}

impl Default for CountingPolicy {
    fn default() -> Self {
        Self {
            high_threshold: 0.8,
            low_threshold: 0.2,
            stable_count_required: 3,
        }
    }
}

/// Which debouncing strategy the state estimator runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorPolicy {
    Duration(DurationPolicy),
    Counting(CountingPolicy),
}

impl Default for EstimatorPolicy {
    fn default() -> Self {
        Self::Duration(DurationPolicy::default())
    }
}

/// What a transition to "clear" must satisfy before the alarm is released.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeactivationPolicy {
    /// Release the alarm on the clear transition itself.
    #[default]
    Immediate,
    /// Additionally require the window average below `safety_threshold`
    /// and the confirmation counter at its floor.
    Strict { safety_threshold: f32 },
}

/// Core detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    // --- Pins ---
    /// GPIO pin wired to the smoke detector output.
    pub sensor_pin: i32,
    /// GPIO pin driving the alarm relay / buzzer.
    pub alarm_pin: i32,
    /// Digital or analog interpretation of the sensor pin.
    pub input_mode: InputMode,
    /// Digital input polarity: `true` = HIGH means smoke.
    pub active_high: bool,

    // --- Timing ---
    /// Sensor poll interval (milliseconds)
    pub poll_interval_ms: u32,
    /// Retry delay after a failed read (milliseconds)
    pub error_backoff_ms: u32,

    // --- Filtering / estimation ---
    /// Reading window capacity (samples).
    pub window_capacity: usize,
    pub filter: FilterConfig,
    pub policy: EstimatorPolicy,

    // --- Alarm ---
    /// Minimum spacing between two alarm activations (seconds).
    pub alarm_cooldown_secs: u32,
    pub deactivation: DeactivationPolicy,

    // --- Health ---
    /// Consecutive read failures after which the sensor is reported degraded.
    pub degraded_after_failures: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            // Pins
            sensor_pin: 11,
            alarm_pin: 12,
            input_mode: InputMode::Digital,
            active_high: true,

            // Timing
            poll_interval_ms: 100, // 10 Hz
            error_backoff_ms: 1000,

            // Filtering / estimation
            window_capacity: 10,
            filter: FilterConfig::default(),
            policy: EstimatorPolicy::default(),

            // Alarm
            alarm_cooldown_secs: 30,
            deactivation: DeactivationPolicy::Immediate,

            // Health
            degraded_after_failures: 3,
        }
    }
}

impl DetectorConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use ConfigError::ValidationFailed as Invalid;

        if !(0..=MAX_GPIO).contains(&self.sensor_pin) {
            return Err(Invalid("sensor_pin out of range"));
        }
        if !(0..=MAX_GPIO).contains(&self.alarm_pin) {
            return Err(Invalid("alarm_pin out of range"));
        }
        if self.sensor_pin == self.alarm_pin {
            return Err(Invalid("sensor_pin and alarm_pin must differ"));
        }

        if !(10..=1000).contains(&self.poll_interval_ms) {
            return Err(Invalid("poll_interval_ms must be 10..=1000"));
        }
        if self.error_backoff_ms < self.poll_interval_ms || self.error_backoff_ms > 10_000 {
            return Err(Invalid("error_backoff_ms must be poll_interval_ms..=10000"));
        }

        if !(MIN_WINDOW..=MAX_WINDOW).contains(&self.window_capacity) {
            return Err(Invalid("window_capacity must be 3..=32"));
        }
        if !(self.filter.alpha > 0.0 && self.filter.alpha <= 1.0) {
            return Err(Invalid("filter.alpha must be in (0, 1]"));
        }
        if !(1..=MAX_HISTORY).contains(&self.filter.history_len) {
            return Err(Invalid("filter.history_len out of range"));
        }

        match self.policy {
            EstimatorPolicy::Duration(p) => {
                if !unit(p.clear_threshold) || !unit(p.trigger_threshold) {
                    return Err(Invalid("duration thresholds must be in [0, 1]"));
                }
                if p.clear_threshold >= p.trigger_threshold {
                    return Err(Invalid("clear_threshold must be below trigger_threshold"));
                }
                if p.state_change_cooldown_ms > 60_000 || p.min_trigger_duration_ms > 60_000 {
                    return Err(Invalid("duration timings must be <= 60000 ms"));
                }
                // The state-change cooldown is what holds a confirmed smoke
                // state against an early clear.
                if p.state_change_cooldown_ms < p.min_trigger_duration_ms {
                    return Err(Invalid(
                        "state_change_cooldown_ms must be >= min_trigger_duration_ms",
                    ));
                }
            }
            EstimatorPolicy::Counting(p) => {
                if !unit(p.low_threshold) || !unit(p.high_threshold) {
                    return Err(Invalid("counting thresholds must be in [0, 1]"));
                }
                if p.low_threshold >= p.high_threshold {
                    return Err(Invalid("low_threshold must be below high_threshold"));
                }
                if !(1..=1000).contains(&p.stable_count_required) {
                    return Err(Invalid("stable_count_required must be 1..=1000"));
                }
            }
        }

        if let DeactivationPolicy::Strict { safety_threshold } = self.deactivation {
            if !unit(safety_threshold) {
                return Err(Invalid("safety_threshold must be in [0, 1]"));
            }
        }

        if self.degraded_after_failures == 0 {
            return Err(Invalid("degraded_after_failures must be >= 1"));
        }

        Ok(())
    }

    /// Alarm cooldown in milliseconds.
    pub fn alarm_cooldown_ms(&self) -> u64 {
        u64::from(self.alarm_cooldown_secs) * 1000
    }
}

fn unit(v: f32) -> bool {
    (0.0..=1.0).contains(&v)
}
