//! Detector loop tests: real polling thread, mock pins, synthetic clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use smokewatch::app::commands::{AppCommand, CommandReply};
use smokewatch::app::events::AppEvent;
use smokewatch::app::ports::AlarmPort;
use smokewatch::config::DetectorConfig;
use smokewatch::drivers::AlarmOutput;
use smokewatch::error::{ConfigError, Error, SensorError};
use smokewatch::sensors::{ScriptedSensor, SimulatedSensor};
use smokewatch::{Detector, DetectorHandle};

use crate::mock_hw::{MockPin, RecordingRecords, RecordingSink, StepClock, fast_config, wait_until};

const TIMEOUT: Duration = Duration::from_secs(5);

struct Taps {
    pin: MockPin,
    events: RecordingSink,
    records: RecordingRecords,
}

fn start(
    config: DetectorConfig,
    sensor: impl smokewatch::app::ports::SensorPort + Send + 'static,
) -> (DetectorHandle<AlarmOutput<MockPin>>, Taps) {
    let pin = MockPin::new();
    let alarm = Arc::new(AlarmOutput::new(pin.clone()).unwrap());
    let events = RecordingSink::new();
    let records = RecordingRecords::new();
    let handle = Detector::new(config, sensor, alarm)
        .unwrap()
        .with_clock(StepClock::new(200))
        .with_event_sink(events.clone())
        .with_record_sink(records.clone())
        .start()
        .unwrap();
    (
        handle,
        Taps {
            pin,
            events,
            records,
        },
    )
}

#[test]
fn invalid_config_is_rejected_before_start() {
    let config = DetectorConfig {
        sensor_pin: 12,
        alarm_pin: 12,
        ..DetectorConfig::default()
    };
    let alarm = Arc::new(AlarmOutput::new(MockPin::new()).unwrap());
    let result = Detector::new(config, SimulatedSensor::digital(), alarm);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::ValidationFailed(_)))
    ));
}

#[test]
fn sustained_smoke_sounds_alarm_once() {
    let sensor = SimulatedSensor::digital();
    sensor.set_level(1.0);
    let (mut handle, taps) = start(fast_config(), sensor);

    assert!(wait_until(TIMEOUT, || handle.status().alarm_active));
    assert!(wait_until(TIMEOUT, || handle.status().metrics.polls > 40));
    handle.stop();

    assert_eq!(taps.pin.rising_edges(), 1);
    assert_eq!(taps.events.activations().len(), 1);
    let first_smoke = taps.events.snapshot().into_iter().find_map(|e| match e {
        AppEvent::StateChanged { to, at_ms, .. } if to.is_smoke() => Some(at_ms),
        _ => None,
    });
    assert!(first_smoke.is_some_and(|t| t >= 500));
}

#[test]
fn stop_releases_alarm_and_silences_observers() {
    let sensor = SimulatedSensor::digital();
    let (mut handle, taps) = start(fast_config(), sensor.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        handle.add_callback(move |_smoke: bool| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    sensor.set_level(1.0);
    assert!(wait_until(TIMEOUT, || handle.status().alarm_active));
    handle.stop();

    let status = handle.status();
    assert!(!status.running);
    assert!(!status.alarm_active);
    assert!(!taps.pin.is_high());
    assert_eq!(taps.events.snapshot().last(), Some(&AppEvent::Stopped));

    let seen = calls.load(Ordering::SeqCst);
    assert!(seen >= 1);
    sensor.set_level(0.0);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), seen);

    // Second stop is a no-op.
    handle.stop();
}

#[test]
fn callbacks_receive_each_transition_in_order() {
    let sensor = SimulatedSensor::analog();
    let (handle, _taps) = start(fast_config(), sensor.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    for id in 0..2 {
        let seen = Arc::clone(&seen);
        handle.add_callback(move |smoke: bool| seen.lock().unwrap().push((id, smoke)));
    }

    sensor.set_level(1.0);
    assert!(wait_until(TIMEOUT, || seen.lock().unwrap().len() == 2));
    sensor.set_level(0.0);
    assert!(wait_until(TIMEOUT, || seen.lock().unwrap().len() == 4));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(0, true), (1, true), (0, false), (1, false)]
    );
}

#[test]
fn failing_sensor_is_reported_degraded() {
    let sensor = ScriptedSensor::new([Err(SensorError::GpioReadFailed)]).looping();
    let (handle, taps) = start(fast_config(), sensor);

    assert!(wait_until(TIMEOUT, || handle.status().sensor_degraded));
    let status = handle.status();
    assert_eq!(status.smoke_detected, None);
    assert_eq!(status.error.as_deref(), Some("GPIO read failed"));
    assert!(status.consecutive_failures >= 3);
    assert_eq!(taps.records.len(), 0);
    assert_eq!(
        taps
            .events
            .count(|e| matches!(e, AppEvent::SensorDegraded { .. })),
        1
    );
}

#[test]
fn toggle_command_disables_and_silences() {
    let sensor = SimulatedSensor::digital();
    sensor.set_level(1.0);
    let (handle, taps) = start(fast_config(), sensor);
    assert!(wait_until(TIMEOUT, || handle.status().alarm_active));

    assert_eq!(
        handle.handle_command(AppCommand::ToggleAlarmEnabled),
        CommandReply::AlarmEnabled(false)
    );
    match handle.handle_command(AppCommand::GetStatus) {
        CommandReply::Status(status) => {
            assert!(!status.alarm_enabled);
            assert!(!status.alarm_active);
            assert_eq!(status.smoke_detected, Some(true));
        }
        other => panic!("unexpected reply {:?}", other),
    }
    assert!(!taps.pin.is_high());
    assert!(!handle.alarm().status().active);
}

#[test]
fn history_and_records_follow_successful_polls() {
    let sensor = ScriptedSensor::from_bits([false; 12]);
    let (handle, taps) = start(fast_config(), sensor);

    assert!(wait_until(TIMEOUT, || handle.history().data.len() == 12));
    let report = match handle.handle_command(AppCommand::GetHistory) {
        CommandReply::History(report) => report,
        other => panic!("unexpected reply {:?}", other),
    };
    assert_eq!(report.data.len(), 12);
    assert_eq!(report.summary.smoke_detections, 0);
    assert_eq!(report.summary.alarm_activations, 0);
    assert!(report.summary.uptime_secs > 0.0);
    assert!(report.data.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    assert_eq!(taps.records.len(), 12);
}
