//! Digital smoke detector input.
//!
//! Wraps any `embedded_hal` input pin.  Most detector modules pull their
//! output low on alarm, so the active level is configurable.

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::SensorPort;
use crate::error::SensorError;

use super::Reading;

pub struct DigitalSmokeSensor<P> {
    pin: P,
    active_high: bool,
}

impl<P: InputPin> DigitalSmokeSensor<P> {
    pub fn new(pin: P, active_high: bool) -> Self {
        Self { pin, active_high }
    }

    pub fn active_high(&self) -> bool {
        self.active_high
    }

    /// Give the pin back, e.g. to reconfigure it.
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: InputPin> SensorPort for DigitalSmokeSensor<P> {
    fn read(&mut self) -> Result<Reading, SensorError> {
        let high = self.pin.is_high().map_err(|e| {
            warn!("smoke input read failed: {:?}", e);
            SensorError::GpioReadFailed
        })?;
        Ok(Reading::Digital(high == self.active_high))
    }
}
