//! Alarm output driver (buzzer / relay on a GPIO).
//!
//! A dumb actuator: policy lives in the arbiter.  The driver only keeps
//! the `active` / `enabled` flags consistent with the pin.
//!
//! ## Invariants
//!
//! - `enabled == false` implies `active == false`.
//! - Flags change only after the pin write succeeded.  A failed write
//!   restores the previous pin level where possible and leaves the flags
//!   as they were.
//! - Disabling releases the output first.  When the release write fails
//!   the alarm stays enabled (and active, if it was), `toggle_enabled`
//!   returns `true`, and `disable_epoch` is not bumped.
//!
//! The pin sits behind a mutex so the polling thread and external readers
//! (status queries, the enable toggle) share one driver.

use std::sync::{Mutex, MutexGuard};

use embedded_hal::digital::{ErrorType, OutputPin};
use log::{error, info};

use crate::app::ports::{AlarmPort, AlarmStatus};
use crate::error::ActuatorError;

struct Inner<P> {
    pin: P,
    status: AlarmStatus,
}

pub struct AlarmOutput<P> {
    inner: Mutex<Inner<P>>,
}

impl<P: OutputPin + Send> AlarmOutput<P> {
    /// Take the pin, drive it low, and start enabled and inactive.
    pub fn new(mut pin: P) -> Result<Self, ActuatorError> {
        pin.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                pin,
                status: AlarmStatus {
                    active: false,
                    enabled: true,
                    disable_epoch: 0,
                },
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner<P>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run `f` with the pin.  Test hook for inspecting a mock pin.
    pub fn with_pin<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.lock().pin)
    }
}

impl<P: OutputPin + Send> AlarmPort for AlarmOutput<P> {
    fn activate(&self) -> Result<bool, ActuatorError> {
        let mut inner = self.lock();
        if !inner.status.enabled {
            info!("Alarm activation prevented - alarm is disabled");
            return Ok(false);
        }
        if let Err(e) = inner.pin.set_high() {
            error!("Error activating alarm: {:?}", e);
            let _ = inner.pin.set_low();
            return Err(ActuatorError::GpioWriteFailed);
        }
        inner.status.active = true;
        Ok(true)
    }

    fn deactivate(&self) -> Result<bool, ActuatorError> {
        let mut inner = self.lock();
        if let Err(e) = inner.pin.set_low() {
            error!("Error deactivating alarm: {:?}", e);
            if inner.status.active {
                let _ = inner.pin.set_high();
            }
            return Err(ActuatorError::GpioWriteFailed);
        }
        inner.status.active = false;
        Ok(true)
    }

    fn toggle_enabled(&self) -> bool {
        let mut inner = self.lock();
        if !inner.status.enabled {
            inner.status.enabled = true;
            info!("Alarm enabled");
            return true;
        }

        // Disabling forces the output off; if that fails the alarm stays
        // enabled so the flags keep describing the pin.
        if let Err(e) = inner.pin.set_low() {
            error!("Alarm disable failed, output could not be released: {:?}", e);
            if inner.status.active {
                let _ = inner.pin.set_high();
            }
            return true;
        }
        inner.status.active = false;
        inner.status.enabled = false;
        inner.status.disable_epoch = inner.status.disable_epoch.wrapping_add(1);
        info!("Alarm disabled");
        false
    }

    fn status(&self) -> AlarmStatus {
        self.lock().status
    }
}

/// In-memory output pin for host runs without hardware.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimPin {
    pub high: bool,
}

impl ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::ErrorKind;

    /// Pin whose writes can be made to fail on demand.
    #[derive(Default)]
    struct FlakyPin {
        high: bool,
        fail: bool,
    }

    impl ErrorType for FlakyPin {
        type Error = ErrorKind;
    }

    impl OutputPin for FlakyPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            self.high = true;
            Ok(())
        }
    }

    #[test]
    fn starts_low_enabled_inactive() {
        let alarm = AlarmOutput::new(SimPin { high: true }).unwrap();
        assert!(!alarm.with_pin(|p| p.high));
        let s = alarm.status();
        assert!(s.enabled);
        assert!(!s.active);
    }

    #[test]
    fn activate_and_deactivate_drive_the_pin() {
        let alarm = AlarmOutput::new(SimPin::default()).unwrap();
        assert_eq!(alarm.activate(), Ok(true));
        assert!(alarm.with_pin(|p| p.high));
        assert!(alarm.status().active);
        assert_eq!(alarm.deactivate(), Ok(true));
        assert!(!alarm.with_pin(|p| p.high));
        assert!(!alarm.status().active);
    }

    #[test]
    fn disable_forces_off_and_blocks_activation() {
        let alarm = AlarmOutput::new(SimPin::default()).unwrap();
        alarm.activate().unwrap();
        assert!(!alarm.toggle_enabled());
        let s = alarm.status();
        assert!(!s.enabled);
        assert!(!s.active);
        assert_eq!(s.disable_epoch, 1);
        assert!(!alarm.with_pin(|p| p.high));

        assert_eq!(alarm.activate(), Ok(false));
        assert!(!alarm.status().active);

        // Re-enabling does not sound the alarm.
        assert!(alarm.toggle_enabled());
        assert!(!alarm.status().active);
        assert_eq!(alarm.status().disable_epoch, 1);
    }

    #[test]
    fn failed_write_leaves_flags_untouched() {
        let alarm = AlarmOutput::new(FlakyPin::default()).unwrap();
        alarm.with_pin(|p| p.fail = true);
        assert_eq!(alarm.activate(), Err(ActuatorError::GpioWriteFailed));
        assert!(!alarm.status().active);

        alarm.with_pin(|p| p.fail = false);
        alarm.activate().unwrap();
        alarm.with_pin(|p| p.fail = true);
        assert_eq!(alarm.deactivate(), Err(ActuatorError::GpioWriteFailed));
        assert!(alarm.status().active);

        // Disable that cannot release the output is rolled back.
        assert!(alarm.toggle_enabled());
        assert!(alarm.status().enabled);
        assert!(alarm.status().active);
    }

    #[test]
    fn disable_with_stuck_output_stays_enabled() {
        let alarm = AlarmOutput::new(FlakyPin::default()).unwrap();
        alarm.activate().unwrap();
        alarm.with_pin(|p| p.fail = true);

        assert!(alarm.toggle_enabled(), "disable reports still enabled");
        let s = alarm.status();
        assert!(s.enabled);
        assert!(s.active);
        assert_eq!(s.disable_epoch, 0);
        assert!(alarm.with_pin(|p| p.high));

        // Once the pin recovers the same toggle disables normally.
        alarm.with_pin(|p| p.fail = false);
        assert!(!alarm.toggle_enabled());
        let s = alarm.status();
        assert!(!s.enabled);
        assert!(!s.active);
        assert_eq!(s.disable_epoch, 1);
        assert!(!alarm.with_pin(|p| p.high));
    }

    #[test]
    fn construction_fails_on_dead_pin() {
        let pin = FlakyPin {
            high: false,
            fail: true,
        };
        assert!(matches!(
            AlarmOutput::new(pin),
            Err(ActuatorError::GpioWriteFailed)
        ));
    }
}
