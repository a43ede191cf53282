//! Detector service: the hexagonal core.
//!
//! [`DetectorService`] owns the state estimator, alarm arbiter, sensor
//! health, and metrics.  It exposes one call per poll; all I/O flows
//! through port traits passed at the call site, so the whole pipeline is
//! testable with mock adapters and synthetic timestamps.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │       DetectorService        │ ──▶ RecordSink
//!  AlarmPort  ◀── │  Estimator · Arbiter · Health│
//!                 └──────────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::arbiter::{AlarmAction, AlarmArbiter, DeactivationGate};
use crate::config::DetectorConfig;
use crate::diagnostics::{HealthChange, RuntimeMetrics, SensorHealth};
use crate::error::SensorError;
use crate::estimator::{StateChange, StateEstimator};
use crate::sensors::{Reading, Sample};

use super::events::{AppEvent, PollRecord};
use super::history::DataPoint;
use super::observers::ObserverRegistry;
use super::ports::{AlarmPort, EventSink, RecordSink};
use super::status::DetectorStatus;

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A reading was taken and evaluated.
    Sampled {
        sample: Sample,
        change: Option<StateChange>,
        action: AlarmAction,
        point: DataPoint,
    },
    /// The read failed; the caller should back off before the next poll.
    ReadFailed { error: SensorError, degraded: bool },
}

pub struct DetectorService {
    config: DetectorConfig,
    estimator: StateEstimator,
    arbiter: AlarmArbiter,
    health: SensorHealth,
    metrics: RuntimeMetrics,
}

impl DetectorService {
    /// Build the service.  `config` is expected to be validated already.
    pub fn new(config: DetectorConfig, observers: ObserverRegistry) -> Self {
        Self {
            estimator: StateEstimator::new(&config),
            arbiter: AlarmArbiter::new(&config, observers),
            health: SensorHealth::new(config.degraded_after_failures),
            metrics: RuntimeMetrics::default(),
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        info!(
            "Smoke monitoring started (pin {}, poll {} ms, window {})",
            self.config.sensor_pin, self.config.poll_interval_ms, self.config.window_capacity
        );
        sink.emit(&AppEvent::Started);
    }

    /// Release the alarm if it is sounding and report the stop.
    pub fn stop<A>(&mut self, now_ms: u64, alarm: &A, sink: &mut impl EventSink)
    where
        A: AlarmPort + ?Sized,
    {
        if alarm.status().active {
            match alarm.deactivate() {
                Ok(_) => sink.emit(&AppEvent::AlarmDeactivated { at_ms: now_ms }),
                Err(e) => {
                    error!("Failed to release alarm on stop: {}", e);
                    self.metrics.actuator_faults += 1;
                    sink.emit(&AppEvent::AlarmFault(e));
                }
            }
        }
        info!("Smoke monitoring stopped");
        sink.emit(&AppEvent::Stopped);
    }

    // ── Per-poll orchestration ────────────────────────────────

    /// Run one poll: health → estimator → arbiter → observers → record.
    pub fn tick<A>(
        &mut self,
        read: Result<Reading, SensorError>,
        now_ms: u64,
        alarm: &A,
        sink: &mut impl EventSink,
        records: &mut impl RecordSink,
    ) -> TickOutcome
    where
        A: AlarmPort + ?Sized,
    {
        self.metrics.polls += 1;

        let reading = match read {
            Ok(reading) => reading,
            Err(error) => return self.on_read_failure(error, sink),
        };
        if let HealthChange::Recovered { after_failures } = self.health.record_success() {
            info!("Sensor recovered after {} failed reads", after_failures);
            sink.emit(&AppEvent::SensorRecovered { after_failures });
        }

        let sample = Sample::new(now_ms, reading);
        let change = self.estimator.observe(sample);
        if let Some(c) = &change {
            self.metrics.transitions += 1;
            sink.emit(&AppEvent::StateChanged {
                from: c.from,
                to: c.to,
                at_ms: c.at_ms,
            });
        }

        let gate = DeactivationGate {
            window_average: self.estimator.window_average(),
            at_floor: self.estimator.at_confirmation_floor(),
        };
        let arbitration = self.arbiter.arbitrate(change.as_ref(), gate, now_ms, alarm);
        self.report_action(arbitration.action, now_ms, sink);
        for failure in arbitration.observer_failures {
            self.metrics.observer_failures += 1;
            sink.emit(&AppEvent::ObserverFailed(failure));
        }

        let alarm_status = alarm.status();
        let smoke = self.estimator.is_smoke();
        records.append(&PollRecord {
            timestamp_ms: now_ms,
            raw_reading: sample.value(),
            stable_state: smoke,
            window_average: self.estimator.window_average(),
            alarm_active: alarm_status.active,
        });
        self.metrics.dropped_records = records.dropped();

        TickOutcome::Sampled {
            sample,
            change,
            action: arbitration.action,
            point: DataPoint {
                timestamp_ms: now_ms,
                smoke_detected: smoke,
                alarm_active: alarm_status.active,
                alarm_enabled: alarm_status.enabled,
            },
        }
    }

    fn on_read_failure(&mut self, error: SensorError, sink: &mut impl EventSink) -> TickOutcome {
        self.metrics.read_failures += 1;
        let change = self.health.record_failure(error);
        let consecutive = self.health.consecutive_failures();
        warn!("Error in monitoring loop: {} ({} consecutive)", error, consecutive);
        sink.emit(&AppEvent::SensorFault { error, consecutive });

        if change == HealthChange::BecameDegraded {
            error!("Sensor degraded after {} consecutive failures", consecutive);
            sink.emit(&AppEvent::SensorDegraded { consecutive });
        }
        TickOutcome::ReadFailed {
            error,
            degraded: self.health.is_degraded(),
        }
    }

    fn report_action(&mut self, action: AlarmAction, at_ms: u64, sink: &mut impl EventSink) {
        match action {
            AlarmAction::None | AlarmAction::Pending => {}
            AlarmAction::Activated => {
                self.metrics.alarm_activations += 1;
                sink.emit(&AppEvent::AlarmActivated { at_ms });
            }
            AlarmAction::Deactivated => sink.emit(&AppEvent::AlarmDeactivated { at_ms }),
            AlarmAction::Suppressed(reason) => {
                self.metrics.suppressed_activations += 1;
                sink.emit(&AppEvent::AlarmSuppressed { reason, at_ms });
            }
            AlarmAction::DeactivationDeferred => {
                sink.emit(&AppEvent::DeactivationDeferred { at_ms });
            }
            AlarmAction::Failed(e) => {
                self.metrics.actuator_faults += 1;
                sink.emit(&AppEvent::AlarmFault(e));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Snapshot for external readers.  `running` is left for the caller.
    pub fn status<A>(&self, alarm: &A) -> DetectorStatus
    where
        A: AlarmPort + ?Sized,
    {
        let alarm_status = alarm.status();
        let degraded = self.health.is_degraded();
        DetectorStatus {
            running: false,
            smoke_detected: (!degraded).then(|| self.estimator.is_smoke()),
            filtered_value: self.estimator.filtered_value(),
            raw_readings: self.estimator.window().values().iter().copied().collect(),
            window_average: self.estimator.window_average(),
            alarm_active: alarm_status.active,
            alarm_enabled: alarm_status.enabled,
            sensor_degraded: degraded,
            consecutive_failures: self.health.consecutive_failures(),
            error: self.health.last_error().map(|e| e.to_string()),
            last_trigger_ms: self.arbiter.last_trigger_ms(),
            metrics: self.metrics,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn estimator(&self) -> &StateEstimator {
        &self.estimator
    }

    pub fn arbiter(&self) -> &AlarmArbiter {
        &self.arbiter
    }

    pub fn metrics(&self) -> &RuntimeMetrics {
        &self.metrics
    }

    pub fn health(&self) -> &SensorHealth {
        &self.health
    }
}
