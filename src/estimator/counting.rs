//! Policy B: consecutive-confirmation counting on the window average.
//!
//! A bounded counter walks between 0 and `stable_count_required`: up on a
//! high average, down on a low one, held in between.  The state flips only
//! at the counter extremes, so a confirmed smoke state needs the same
//! number of contrary readings to clear as it took to confirm.

use super::DetectionState;
use crate::config::CountingPolicy;

pub struct CountingEstimator {
    policy: CountingPolicy,
    stable_count: u16,
}

impl CountingEstimator {
    pub fn new(policy: CountingPolicy) -> Self {
        Self {
            policy,
            stable_count: 0,
        }
    }

    pub fn evaluate(&mut self, average: f32, current: DetectionState) -> Option<DetectionState> {
        let required = self.policy.stable_count_required;

        if average >= self.policy.high_threshold {
            self.stable_count = self.stable_count.saturating_add(1).min(required);
        } else if average <= self.policy.low_threshold {
            self.stable_count = self.stable_count.saturating_sub(1);
        }

        match current {
            DetectionState::Clear if self.stable_count >= required => Some(DetectionState::Smoke),
            DetectionState::Smoke if self.stable_count == 0 => Some(DetectionState::Clear),
            _ => None,
        }
    }

    pub fn stable_count(&self) -> u16 {
        self.stable_count
    }

    pub fn policy(&self) -> &CountingPolicy {
        &self.policy
    }
}
