//! End-to-end scenarios through `DetectorService` with synthetic
//! timestamps.  No threads, no sleeps: each poll is one `tick` call.

use smokewatch::app::events::{AppEvent, SuppressReason};
use smokewatch::app::observers::ObserverRegistry;
use smokewatch::app::ports::{AlarmPort, NullRecordSink};
use smokewatch::app::service::DetectorService;
use smokewatch::config::{CountingPolicy, DeactivationPolicy, DetectorConfig, EstimatorPolicy};
use smokewatch::drivers::AlarmOutput;
use smokewatch::estimator::DetectionState;
use smokewatch::sensors::Reading;

use crate::mock_hw::{MockPin, RecordingSink};

struct Rig {
    svc: DetectorService,
    alarm: AlarmOutput<MockPin>,
    pin: MockPin,
    sink: RecordingSink,
    now_ms: u64,
    period_ms: u64,
}

impl Rig {
    fn new(config: DetectorConfig, period_ms: u64) -> Self {
        let pin = MockPin::new();
        Self {
            svc: DetectorService::new(config, ObserverRegistry::new()),
            alarm: AlarmOutput::new(pin.clone()).unwrap(),
            pin,
            sink: RecordingSink::new(),
            now_ms: 0,
            period_ms,
        }
    }

    fn feed(&mut self, level: f32, polls: usize) {
        for _ in 0..polls {
            self.svc.tick(
                Ok(Reading::Analog(level)),
                self.now_ms,
                &self.alarm,
                &mut self.sink,
                &mut NullRecordSink,
            );
            self.now_ms += self.period_ms;
        }
    }

    fn transitions(&self) -> Vec<(DetectionState, u64)> {
        self.sink
            .snapshot()
            .into_iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { to, at_ms, .. } => Some((to, at_ms)),
                _ => None,
            })
            .collect()
    }
}

fn window5() -> DetectorConfig {
    DetectorConfig {
        window_capacity: 5,
        ..DetectorConfig::default()
    }
}

#[test]
fn all_zero_input_filters_to_zero_and_stays_clear() {
    let mut rig = Rig::new(DetectorConfig::default(), 100);
    rig.feed(0.0, 50);

    let status = rig.svc.status(&rig.alarm);
    assert_eq!(status.filtered_value, Some(0.0));
    assert_eq!(status.smoke_detected, Some(false));
    assert!(rig.transitions().is_empty());
    assert_eq!(rig.pin.rising_edges(), 0);
}

#[test]
fn constant_smoke_at_200ms_activates_exactly_once() {
    let mut rig = Rig::new(DetectorConfig::default(), 200);
    rig.feed(1.0, 60);

    let transitions = rig.transitions();
    assert_eq!(transitions.len(), 1);
    let (to, at_ms) = transitions[0];
    assert_eq!(to, DetectionState::Smoke);
    // Window fills at 1800 ms; the trigger must then hold for 500 ms.
    assert!(at_ms >= 1800 + 500);
    assert_eq!(rig.pin.rising_edges(), 1);
    assert_eq!(rig.sink.activations().len(), 1);
    assert!(rig.alarm.status().active);
}

#[test]
fn alternating_input_never_triggers() {
    let mut rig = Rig::new(DetectorConfig::default(), 100);
    for i in 0..400 {
        rig.feed(if i % 2 == 0 { 1.0 } else { 0.0 }, 1);
    }
    assert!(rig.transitions().is_empty());
    assert!(!rig.alarm.status().active);
    assert_eq!(rig.pin.rising_edges(), 0);
}

#[test]
fn second_episode_waits_out_alarm_cooldown() {
    let mut rig = Rig::new(window5(), 100);
    rig.feed(1.0, 20); // 0..2000
    rig.feed(0.0, 30); // 2000..5000
    rig.feed(1.0, 400); // 5000..45000

    let activations = rig.sink.activations();
    assert_eq!(activations.len(), 2, "events: {:?}", rig.sink.snapshot());
    assert_eq!(activations[1] - activations[0], 30_000);

    let states: Vec<_> = rig.transitions().into_iter().map(|(s, _)| s).collect();
    assert_eq!(
        states,
        vec![DetectionState::Smoke, DetectionState::Clear, DetectionState::Smoke]
    );
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::AlarmSuppressed {
                reason: SuppressReason::Cooldown { .. },
                ..
            }
        )),
        1
    );
    assert_eq!(rig.pin.rising_edges(), 2);
}

#[test]
fn re_enabling_does_not_reactivate_ongoing_smoke() {
    let mut rig = Rig::new(window5(), 100);
    rig.feed(1.0, 20);
    assert!(rig.alarm.status().active);

    assert!(!rig.alarm.toggle_enabled());
    assert!(!rig.alarm.status().active);
    assert!(!rig.pin.is_high());
    rig.feed(1.0, 10);
    assert!(rig.alarm.toggle_enabled());
    rig.feed(1.0, 400);

    assert!(!rig.alarm.status().active);
    assert_eq!(rig.pin.rising_edges(), 1);
    assert!(rig.svc.estimator().is_smoke());
}

#[test]
fn strict_deactivation_holds_until_window_settles() {
    let config = DetectorConfig {
        window_capacity: 5,
        policy: EstimatorPolicy::Counting(CountingPolicy::default()),
        deactivation: DeactivationPolicy::Strict {
            safety_threshold: 0.1,
        },
        ..DetectorConfig::default()
    };
    let mut rig = Rig::new(config, 100);
    rig.feed(1.0, 10); // smoke confirmed at 600
    rig.feed(0.15, 10); // clear at 1600, average stuck at 0.15
    assert!(!rig.svc.estimator().is_smoke());
    assert!(rig.alarm.status().active);
    assert!(rig
        .sink
        .snapshot()
        .contains(&AppEvent::DeactivationDeferred { at_ms: 1600 }));

    rig.feed(0.0, 5);
    assert!(!rig.alarm.status().active);
    assert!(rig
        .sink
        .snapshot()
        .contains(&AppEvent::AlarmDeactivated { at_ms: 2100 }));
}

#[test]
fn actuator_failure_leaves_detection_untouched() {
    let mut rig = Rig::new(window5(), 100);
    rig.pin.set_failing(true);
    rig.feed(1.0, 20);

    assert!(rig.svc.estimator().is_smoke());
    assert!(!rig.alarm.status().active);
    assert!(rig.svc.metrics().actuator_faults > 0);

    // The pending activation goes through once the pin recovers.
    rig.pin.set_failing(false);
    rig.feed(1.0, 1);
    assert!(rig.alarm.status().active);
    assert_eq!(rig.sink.activations().len(), 1);
}
