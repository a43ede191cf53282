//! Analog smoke sensor (MQ-2 class) read through an ADC channel.
//!
//! The raw ADC count is mapped through a two-point linear calibration to a
//! normalised level in [0, 1]: `zero_adc` is clean air, `span_adc` is the
//! level treated as full-scale smoke.
//!
//! The ADC itself is abstracted as a closure so the same driver serves the
//! ESP-IDF oneshot API and host tests.

use serde::{Deserialize, Serialize};

use crate::app::ports::SensorPort;
use crate::error::SensorError;

use super::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    pub zero_adc: u16,
    pub span_adc: u16,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            zero_adc: 200,
            span_adc: 2000,
        }
    }
}

impl Calibration {
    /// Map a raw count to [0, 1].  A degenerate calibration (span at or
    /// below zero) maps everything above `zero_adc` to full-scale.
    pub fn normalise(&self, raw: u16) -> f32 {
        if raw <= self.zero_adc {
            return 0.0;
        }
        if self.span_adc <= self.zero_adc {
            return 1.0;
        }
        let level = f32::from(raw - self.zero_adc) / f32::from(self.span_adc - self.zero_adc);
        level.min(1.0)
    }
}

pub struct AnalogSmokeSensor<F> {
    adc: F,
    cal: Calibration,
    last_raw: Option<u16>,
}

impl<F> AnalogSmokeSensor<F>
where
    F: FnMut() -> Result<u16, SensorError>,
{
    pub fn new(adc: F, cal: Calibration) -> Self {
        Self {
            adc,
            cal,
            last_raw: None,
        }
    }

    pub fn set_calibration(&mut self, cal: Calibration) {
        self.cal = cal;
    }

    pub fn calibration(&self) -> Calibration {
        self.cal
    }

    /// Last successfully read ADC count.
    pub fn last_raw(&self) -> Option<u16> {
        self.last_raw
    }
}

impl<F> SensorPort for AnalogSmokeSensor<F>
where
    F: FnMut() -> Result<u16, SensorError>,
{
    fn read(&mut self) -> Result<Reading, SensorError> {
        let raw = (self.adc)()?;
        self.last_raw = Some(raw);
        Ok(Reading::Analog(self.cal.normalise(raw)))
    }
}
