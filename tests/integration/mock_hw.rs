//! Mock hardware and recording adapters for integration tests.
//!
//! Every mock shares its state through `Arc`s so a test can keep a handle
//! after the mock itself has moved onto the polling thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use smokewatch::app::events::{AppEvent, PollRecord};
use smokewatch::app::ports::{Clock, EventSink, RecordSink};
use smokewatch::config::DetectorConfig;

// ── Alarm pin ─────────────────────────────────────────────────

/// Output pin that records every successful write and can be told to fail.
#[derive(Clone, Default)]
pub struct MockPin {
    pub writes: Arc<Mutex<Vec<bool>>>,
    pub fail: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.writes.lock().unwrap().last().copied().unwrap_or(false)
    }

    /// Number of low→high transitions driven so far.
    pub fn rising_edges(&self) -> usize {
        let writes = self.writes.lock().unwrap();
        let mut level = false;
        let mut edges = 0;
        for &w in writes.iter() {
            if w && !level {
                edges += 1;
            }
            level = w;
        }
        edges
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn write(&mut self, high: bool) -> Result<(), ErrorKind> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ErrorKind::Other);
        }
        self.writes.lock().unwrap().push(high);
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

// ── Event and record sinks ────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<AppEvent>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    /// Timestamps of every `AlarmActivated`.
    pub fn activations(&self) -> Vec<u64> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                AppEvent::AlarmActivated { at_ms } => Some(*at_ms),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Clone, Default)]
pub struct RecordingRecords {
    pub records: Arc<Mutex<Vec<PollRecord>>>,
}

#[allow(dead_code)]
impl RecordingRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl RecordSink for RecordingRecords {
    fn append(&mut self, record: &PollRecord) {
        self.records.lock().unwrap().push(*record);
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Synthetic clock: every query advances by `step_ms`, starting at 0.
/// Keeps sample timestamps deterministic while the loop sleeps for real.
pub struct StepClock {
    next: AtomicU64,
    step_ms: u64,
}

impl StepClock {
    pub fn new(step_ms: u64) -> Self {
        Self {
            next: AtomicU64::new(0),
            step_ms,
        }
    }
}

impl Clock for StepClock {
    fn now_ms(&self) -> u64 {
        self.next.fetch_add(self.step_ms, Ordering::SeqCst)
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Fast-polling config for loop tests: 10 ms polls, window of 5.
#[allow(dead_code)]
pub fn fast_config() -> DetectorConfig {
    DetectorConfig {
        poll_interval_ms: 10,
        error_backoff_ms: 10,
        window_capacity: 5,
        ..DetectorConfig::default()
    }
}

/// Spin until `cond` holds or `timeout` expires.  Returns the final value.
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
