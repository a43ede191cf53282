//! Policy A: duration-based hysteresis on the filtered value.
//!
//! ```text
//!  filtered ≤ clear_threshold   → disarm trigger, want Clear
//!  filtered ≥ trigger_threshold → arm trigger (if unarmed), no change yet
//!  trigger armed ≥ min duration → want Smoke
//!  otherwise (dead zone)        → hold
//! ```
//!
//! An armed trigger keeps timing through the dead zone; only a reading at
//! or below the clear threshold disarms it.  Every wanted change is
//! further gated by `state_change_cooldown_ms` since the last applied
//! change; a blocked change is simply re-derived on a later poll.

use log::debug;

use super::DetectionState;
use crate::config::DurationPolicy;

pub struct DurationEstimator {
    policy: DurationPolicy,
    trigger_start_ms: Option<u64>,
    last_change_ms: Option<u64>,
}

impl DurationEstimator {
    pub fn new(policy: DurationPolicy) -> Self {
        Self {
            policy,
            trigger_start_ms: None,
            last_change_ms: None,
        }
    }

    /// Evaluate one filtered value.  Returns the new state if a change is
    /// applied on this call.
    pub fn evaluate(
        &mut self,
        filtered: f32,
        now_ms: u64,
        current: DetectionState,
    ) -> Option<DetectionState> {
        let wanted = self.wanted_state(filtered, now_ms)?;
        if wanted == current {
            return None;
        }

        if let Some(last) = self.last_change_ms {
            let since = now_ms.saturating_sub(last);
            if since < u64::from(self.policy.state_change_cooldown_ms) {
                debug!(
                    "estimator: {:?} -> {:?} held by state-change cooldown ({} ms left)",
                    current,
                    wanted,
                    u64::from(self.policy.state_change_cooldown_ms) - since
                );
                return None;
            }
        }

        self.last_change_ms = Some(now_ms);
        Some(wanted)
    }

    fn wanted_state(&mut self, filtered: f32, now_ms: u64) -> Option<DetectionState> {
        if filtered <= self.policy.clear_threshold {
            self.trigger_start_ms = None;
            return Some(DetectionState::Clear);
        }

        match self.trigger_start_ms {
            None if filtered >= self.policy.trigger_threshold => {
                self.trigger_start_ms = Some(now_ms);
                None
            }
            None => None,
            Some(start) => {
                let armed_for = now_ms.saturating_sub(start);
                (armed_for >= u64::from(self.policy.min_trigger_duration_ms))
                    .then_some(DetectionState::Smoke)
            }
        }
    }

    /// Timestamp at which the trigger was armed, if armed.
    pub fn trigger_start_ms(&self) -> Option<u64> {
        self.trigger_start_ms
    }

    pub fn policy(&self) -> &DurationPolicy {
        &self.policy
    }
}
