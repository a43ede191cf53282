//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (UART / USB-CDC on the device, stderr on a host).
//! A socket broadcast adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] as one line.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | monitoring"),
            AppEvent::Stopped => info!("STOP  | monitoring"),
            AppEvent::StateChanged { from, to, at_ms } => {
                info!("STATE | {:?} -> {:?} @ {} ms", from, to, at_ms);
            }
            AppEvent::AlarmActivated { at_ms } => warn!("ALARM | activated @ {} ms", at_ms),
            AppEvent::AlarmDeactivated { at_ms } => info!("ALARM | deactivated @ {} ms", at_ms),
            AppEvent::AlarmSuppressed { reason, at_ms } => {
                info!("ALARM | suppressed ({:?}) @ {} ms", reason, at_ms);
            }
            AppEvent::DeactivationDeferred { at_ms } => {
                info!("ALARM | deactivation deferred @ {} ms", at_ms);
            }
            AppEvent::AlarmFault(e) => error!("ALARM | fault: {}", e),
            AppEvent::SensorFault { error, consecutive } => {
                warn!("SENSE | read failed: {} (x{})", error, consecutive);
            }
            AppEvent::SensorDegraded { consecutive } => {
                error!("SENSE | degraded after {} failures", consecutive);
            }
            AppEvent::SensorRecovered { after_failures } => {
                info!("SENSE | recovered after {} failures", after_failures);
            }
            AppEvent::ObserverFailed(e) => warn!("OBSRV | callback failed: {}", e),
        }
    }
}
