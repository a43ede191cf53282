//! Alarm arbiter.
//!
//! Runs **every poll after the estimator** and decides whether the alarm
//! output should change.  A detection transition creates a pending intent;
//! the intent is retried on later polls until it is applied or dropped.
//!
//! ## Activation (transition to smoke)
//!
//! 1. Alarm disabled → intent dropped.  A disable/re-enable cycle between
//!    two polls also drops it: re-enabling never reactivates on its own.
//! 2. Alarm already active → intent dropped.
//! 3. Less than `alarm_cooldown` since the last activation → intent kept
//!    and retried each poll while the state stays smoke.
//! 4. Otherwise activate and record the trigger time.
//!
//! ## Deactivation (transition to clear)
//!
//! `Immediate` releases an active alarm at once.  `Strict` additionally
//! waits for the window average to fall below the safety threshold with
//! the estimator at its confirmation floor.
//!
//! After the alarm decision, every registered observer is told the new
//! state.

use log::{error, info, warn};

use crate::app::events::SuppressReason;
use crate::app::observers::ObserverRegistry;
use crate::app::ports::AlarmPort;
use crate::config::{DeactivationPolicy, DetectorConfig};
use crate::error::{ActuatorError, CallbackError};
use crate::estimator::{DetectionState, StateChange};

/// What the arbiter did to the alarm on one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmAction {
    /// Nothing to do.
    None,
    /// An intent is still waiting (cooldown or strict deactivation).
    Pending,
    Activated,
    Deactivated,
    /// A wanted activation was blocked.  Reported once per intent.
    Suppressed(SuppressReason),
    /// A clear transition waits on strict conditions.  Reported once.
    DeactivationDeferred,
    /// Driving the output failed; the intent is kept and retried.
    Failed(ActuatorError),
}

/// Estimator view consulted by strict deactivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeactivationGate {
    pub window_average: Option<f32>,
    pub at_floor: bool,
}

#[derive(Debug)]
pub struct Arbitration {
    pub action: AlarmAction,
    pub observer_failures: Vec<CallbackError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Idle,
    Activate { epoch: u32, reported: bool },
    Deactivate { reported: bool },
}

pub struct AlarmArbiter {
    cooldown_ms: u64,
    deactivation: DeactivationPolicy,
    last_trigger_ms: Option<u64>,
    intent: Intent,
    observers: ObserverRegistry,
}

impl AlarmArbiter {
    pub fn new(config: &DetectorConfig, observers: ObserverRegistry) -> Self {
        Self {
            cooldown_ms: config.alarm_cooldown_ms(),
            deactivation: config.deactivation,
            last_trigger_ms: None,
            intent: Intent::Idle,
            observers,
        }
    }

    /// Process this poll's transition (if any) and retry pending intents.
    pub fn arbitrate<A>(
        &mut self,
        change: Option<&StateChange>,
        gate: DeactivationGate,
        now_ms: u64,
        alarm: &A,
    ) -> Arbitration
    where
        A: AlarmPort + ?Sized,
    {
        if let Some(change) = change {
            self.intent = match change.to {
                DetectionState::Smoke => Intent::Activate {
                    epoch: alarm.status().disable_epoch,
                    reported: false,
                },
                DetectionState::Clear => Intent::Deactivate { reported: false },
            };
        }

        let action = match self.intent {
            Intent::Idle => AlarmAction::None,
            Intent::Activate { epoch, reported } => {
                self.try_activate(epoch, reported, now_ms, alarm)
            }
            Intent::Deactivate { reported } => self.try_deactivate(reported, gate, alarm),
        };

        let observer_failures = match change {
            Some(c) => self.observers.notify(c.to.is_smoke()),
            None => Vec::new(),
        };

        Arbitration {
            action,
            observer_failures,
        }
    }

    fn try_activate<A>(&mut self, epoch: u32, reported: bool, now_ms: u64, alarm: &A) -> AlarmAction
    where
        A: AlarmPort + ?Sized,
    {
        let status = alarm.status();
        if !status.enabled || status.disable_epoch != epoch {
            self.intent = Intent::Idle;
            info!("Alarm activation prevented - alarm is disabled");
            return AlarmAction::Suppressed(SuppressReason::Disabled);
        }
        if status.active {
            self.intent = Intent::Idle;
            return AlarmAction::Suppressed(SuppressReason::AlreadyActive);
        }

        if let Some(last) = self.last_trigger_ms {
            let since = now_ms.saturating_sub(last);
            if since < self.cooldown_ms {
                self.intent = Intent::Activate {
                    epoch,
                    reported: true,
                };
                if reported {
                    return AlarmAction::Pending;
                }
                let remaining_ms = self.cooldown_ms - since;
                info!("Alarm activation held by cooldown ({} ms left)", remaining_ms);
                return AlarmAction::Suppressed(SuppressReason::Cooldown { remaining_ms });
            }
        }

        match alarm.activate() {
            Ok(true) => {
                self.last_trigger_ms = Some(now_ms);
                self.intent = Intent::Idle;
                warn!("ALARM ACTIVATED at {} ms", now_ms);
                AlarmAction::Activated
            }
            Ok(false) => {
                self.intent = Intent::Idle;
                AlarmAction::Suppressed(SuppressReason::Disabled)
            }
            Err(e) => {
                error!("Failed to activate alarm: {}", e);
                AlarmAction::Failed(e)
            }
        }
    }

    fn try_deactivate<A>(&mut self, reported: bool, gate: DeactivationGate, alarm: &A) -> AlarmAction
    where
        A: AlarmPort + ?Sized,
    {
        if !alarm.status().active {
            self.intent = Intent::Idle;
            return AlarmAction::None;
        }

        if let DeactivationPolicy::Strict { safety_threshold } = self.deactivation {
            let calm = gate.at_floor && gate.window_average.is_some_and(|a| a < safety_threshold);
            if !calm {
                self.intent = Intent::Deactivate { reported: true };
                return if reported {
                    AlarmAction::Pending
                } else {
                    info!("Alarm deactivation deferred until readings settle");
                    AlarmAction::DeactivationDeferred
                };
            }
        }

        match alarm.deactivate() {
            Ok(_) => {
                self.intent = Intent::Idle;
                info!("Alarm deactivated");
                AlarmAction::Deactivated
            }
            Err(e) => {
                error!("Failed to deactivate alarm: {}", e);
                AlarmAction::Failed(e)
            }
        }
    }

    /// Time of the last successful activation.
    pub fn last_trigger_ms(&self) -> Option<u64> {
        self.last_trigger_ms
    }

    pub fn has_pending_activation(&self) -> bool {
        matches!(self.intent, Intent::Activate { .. })
    }

    pub fn has_pending_deactivation(&self) -> bool {
        matches!(self.intent, Intent::Deactivate { .. })
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::app::ports::AlarmStatus;

    /// Minimal in-memory alarm.
    #[derive(Default)]
    struct FlagAlarm {
        status: Mutex<AlarmStatus>,
        activations: Mutex<u32>,
        fail_writes: Mutex<bool>,
    }

    impl FlagAlarm {
        fn enabled() -> Self {
            let a = Self::default();
            a.status.lock().unwrap().enabled = true;
            a
        }
    }

    impl AlarmPort for FlagAlarm {
        fn activate(&self) -> Result<bool, ActuatorError> {
            if *self.fail_writes.lock().unwrap() {
                return Err(ActuatorError::GpioWriteFailed);
            }
            let mut s = self.status.lock().unwrap();
            if !s.enabled {
                return Ok(false);
            }
            s.active = true;
            *self.activations.lock().unwrap() += 1;
            Ok(true)
        }

        fn deactivate(&self) -> Result<bool, ActuatorError> {
            if *self.fail_writes.lock().unwrap() {
                return Err(ActuatorError::GpioWriteFailed);
            }
            self.status.lock().unwrap().active = false;
            Ok(true)
        }

        fn toggle_enabled(&self) -> bool {
            let mut s = self.status.lock().unwrap();
            s.enabled = !s.enabled;
            if !s.enabled {
                s.active = false;
                s.disable_epoch += 1;
            }
            s.enabled
        }

        fn status(&self) -> AlarmStatus {
            *self.status.lock().unwrap()
        }
    }

    fn change(to: DetectionState, at_ms: u64) -> StateChange {
        StateChange {
            from: if to.is_smoke() {
                DetectionState::Clear
            } else {
                DetectionState::Smoke
            },
            to,
            at_ms,
            filtered: 0.0,
            window_average: 0.0,
        }
    }

    const CALM: DeactivationGate = DeactivationGate {
        window_average: Some(0.0),
        at_floor: true,
    };

    fn arbiter(config: &DetectorConfig) -> AlarmArbiter {
        AlarmArbiter::new(config, ObserverRegistry::new())
    }

    #[test]
    fn smoke_activates_enabled_alarm() {
        let alarm = FlagAlarm::enabled();
        let mut arb = arbiter(&DetectorConfig::default());
        let out = arb.arbitrate(Some(&change(DetectionState::Smoke, 100)), CALM, 100, &alarm);
        assert_eq!(out.action, AlarmAction::Activated);
        assert!(alarm.status().active);
        assert_eq!(arb.last_trigger_ms(), Some(100));
    }

    #[test]
    fn disabled_alarm_is_never_activated() {
        let alarm = FlagAlarm::default();
        let mut arb = arbiter(&DetectorConfig::default());
        let out = arb.arbitrate(Some(&change(DetectionState::Smoke, 0)), CALM, 0, &alarm);
        assert_eq!(out.action, AlarmAction::Suppressed(SuppressReason::Disabled));

        // Re-enabling does not reactivate retroactively.
        alarm.toggle_enabled();
        let out = arb.arbitrate(None, CALM, 100, &alarm);
        assert_eq!(out.action, AlarmAction::None);
        assert!(!alarm.status().active);
    }

    #[test]
    fn cooldown_blocks_then_allows_reactivation() {
        let alarm = FlagAlarm::enabled();
        let mut arb = arbiter(&DetectorConfig::default());
        arb.arbitrate(Some(&change(DetectionState::Smoke, 0)), CALM, 0, &alarm);
        let out = arb.arbitrate(Some(&change(DetectionState::Clear, 1_000)), CALM, 1_000, &alarm);
        assert_eq!(out.action, AlarmAction::Deactivated);

        let out = arb.arbitrate(Some(&change(DetectionState::Smoke, 2_000)), CALM, 2_000, &alarm);
        assert_eq!(
            out.action,
            AlarmAction::Suppressed(SuppressReason::Cooldown {
                remaining_ms: 28_000
            })
        );
        assert_eq!(arb.arbitrate(None, CALM, 29_999, &alarm).action, AlarmAction::Pending);
        assert!(!alarm.status().active);

        assert_eq!(arb.arbitrate(None, CALM, 30_000, &alarm).action, AlarmAction::Activated);
        assert_eq!(*alarm.activations.lock().unwrap(), 2);
    }

    #[test]
    fn clear_drops_pending_activation() {
        let alarm = FlagAlarm::enabled();
        let mut arb = arbiter(&DetectorConfig::default());
        arb.arbitrate(Some(&change(DetectionState::Smoke, 0)), CALM, 0, &alarm);
        arb.arbitrate(Some(&change(DetectionState::Clear, 1_000)), CALM, 1_000, &alarm);
        arb.arbitrate(Some(&change(DetectionState::Smoke, 2_000)), CALM, 2_000, &alarm);
        assert!(arb.has_pending_activation());
        arb.arbitrate(Some(&change(DetectionState::Clear, 3_000)), CALM, 3_000, &alarm);
        assert!(!arb.has_pending_activation());
        assert_eq!(arb.arbitrate(None, CALM, 40_000, &alarm).action, AlarmAction::None);
    }

    #[test]
    fn disable_cycle_during_cooldown_drops_intent() {
        let alarm = FlagAlarm::enabled();
        let mut arb = arbiter(&DetectorConfig::default());
        arb.arbitrate(Some(&change(DetectionState::Smoke, 0)), CALM, 0, &alarm);
        arb.arbitrate(Some(&change(DetectionState::Clear, 1_000)), CALM, 1_000, &alarm);
        arb.arbitrate(Some(&change(DetectionState::Smoke, 2_000)), CALM, 2_000, &alarm);

        alarm.toggle_enabled();
        alarm.toggle_enabled();
        let out = arb.arbitrate(None, CALM, 31_000, &alarm);
        assert_eq!(out.action, AlarmAction::Suppressed(SuppressReason::Disabled));
        assert!(!alarm.status().active);
    }

    #[test]
    fn strict_deactivation_waits_for_calm_window() {
        let config = DetectorConfig {
            deactivation: DeactivationPolicy::Strict {
                safety_threshold: 0.1,
            },
            ..DetectorConfig::default()
        };
        let alarm = FlagAlarm::enabled();
        let mut arb = arbiter(&config);
        arb.arbitrate(Some(&change(DetectionState::Smoke, 0)), CALM, 0, &alarm);

        let noisy = DeactivationGate {
            window_average: Some(0.25),
            at_floor: true,
        };
        let out = arb.arbitrate(Some(&change(DetectionState::Clear, 500)), noisy, 500, &alarm);
        assert_eq!(out.action, AlarmAction::DeactivationDeferred);
        assert_eq!(arb.arbitrate(None, noisy, 600, &alarm).action, AlarmAction::Pending);
        assert!(alarm.status().active);

        assert_eq!(arb.arbitrate(None, CALM, 700, &alarm).action, AlarmAction::Deactivated);
        assert!(!alarm.status().active);
    }

    #[test]
    fn actuator_failure_is_retried() {
        let alarm = FlagAlarm::enabled();
        *alarm.fail_writes.lock().unwrap() = true;
        let mut arb = arbiter(&DetectorConfig::default());
        let out = arb.arbitrate(Some(&change(DetectionState::Smoke, 0)), CALM, 0, &alarm);
        assert_eq!(out.action, AlarmAction::Failed(ActuatorError::GpioWriteFailed));
        assert!(arb.has_pending_activation());

        *alarm.fail_writes.lock().unwrap() = false;
        assert_eq!(arb.arbitrate(None, CALM, 100, &alarm).action, AlarmAction::Activated);
    }

    #[test]
    fn observers_see_every_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new();
        {
            let seen = Arc::clone(&seen);
            registry.register(move |smoke: bool| seen.lock().unwrap().push(smoke));
        }
        let alarm = FlagAlarm::default();
        let mut arb = AlarmArbiter::new(&DetectorConfig::default(), registry);

        arb.arbitrate(Some(&change(DetectionState::Smoke, 0)), CALM, 0, &alarm);
        arb.arbitrate(None, CALM, 100, &alarm);
        arb.arbitrate(Some(&change(DetectionState::Clear, 200)), CALM, 200, &alarm);
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
        assert_eq!(arb.observers().len(), 1);
    }
}
