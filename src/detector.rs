//! Detector assembly and the polling thread.
//!
//! A [`Detector`] is built once from a validated config plus its adapters,
//! then [`Detector::start`] moves the sensor, estimator, and arbiter onto
//! a dedicated polling thread and returns a [`DetectorHandle`].
//!
//! ```text
//!   caller ──▶ DetectorHandle ──(snapshot lock)──▶ status / history
//!                    │
//!                    ├──▶ Arc<AlarmPort>  ◀── polling thread
//!                    └──▶ ObserverRegistry ◀──┘
//! ```
//!
//! The polling thread is the only writer of detection state.  After each
//! poll it publishes a status snapshot and a history point under a short
//! lock; observers run before that lock is taken, so a callback may query
//! the handle without deadlocking.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

use crate::adapters::time::MonotonicClock;
use crate::app::commands::{AppCommand, CommandReply};
use crate::app::history::{DataHistory, HistoryReport};
use crate::app::observers::{Observer, ObserverRegistry};
use crate::app::ports::{
    AlarmPort, Clock, EventSink, NullEventSink, NullRecordSink, RecordSink, SensorPort,
};
use crate::app::service::{DetectorService, TickOutcome};
use crate::app::status::DetectorStatus;
use crate::config::DetectorConfig;
use crate::drivers::task_pin::{POLL_TASK, spawn_task};
use crate::error::Result;

type BoxedEvents = Box<dyn EventSink + Send>;
type BoxedRecords = Box<dyn RecordSink + Send>;

/// Everything the handle reads and the loop publishes.
struct Snapshot {
    status: DetectorStatus,
    history: DataHistory,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ───────────────────────────────────────────────────────────────
// Builder
// ───────────────────────────────────────────────────────────────

pub struct Detector<S, A> {
    config: DetectorConfig,
    sensor: S,
    alarm: Arc<A>,
    clock: Box<dyn Clock>,
    events: BoxedEvents,
    records: BoxedRecords,
    observers: ObserverRegistry,
}

impl<S, A> Detector<S, A>
where
    S: SensorPort + Send + 'static,
    A: AlarmPort + 'static,
{
    /// Validate `config` and assemble a detector.  Invalid configuration
    /// is the only fatal error (`Error::Config`); nothing has been started
    /// when it is returned.
    pub fn new(config: DetectorConfig, sensor: S, alarm: Arc<A>) -> Result<Self> {
        if let Err(e) = config.validate() {
            error!("Refusing to start detector: {}", e);
            return Err(e.into());
        }
        Ok(Self {
            config,
            sensor,
            alarm,
            clock: Box::new(MonotonicClock::new()),
            events: Box::new(NullEventSink),
            records: Box::new(NullRecordSink),
            observers: ObserverRegistry::new(),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_event_sink(mut self, sink: impl EventSink + Send + 'static) -> Self {
        self.events = Box::new(sink);
        self
    }

    pub fn with_record_sink(mut self, sink: impl RecordSink + Send + 'static) -> Self {
        self.records = Box::new(sink);
        self
    }

    /// Register an observer before the loop starts.
    pub fn add_callback(&self, observer: impl Observer + 'static) {
        self.observers.register(observer);
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Spawn the polling thread.
    pub fn start(self) -> io::Result<DetectorHandle<A>> {
        let Self {
            config,
            mut sensor,
            alarm,
            clock,
            mut events,
            mut records,
            observers,
        } = self;

        let poll_interval = Duration::from_millis(u64::from(config.poll_interval_ms));
        let backoff = Duration::from_millis(u64::from(config.error_backoff_ms));
        let mut service = DetectorService::new(config, observers.clone());

        let mut initial = service.status(&*alarm);
        initial.running = true;
        let shared = Arc::new(Mutex::new(Snapshot {
            status: initial,
            history: DataHistory::new(),
        }));
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let shared = Arc::clone(&shared);
            let running = Arc::clone(&running);
            let alarm = Arc::clone(&alarm);
            spawn_task(POLL_TASK, move || {
                service.start(&mut events);
                while running.load(Ordering::Acquire) {
                    let now_ms = clock.now_ms();
                    let read = sensor.read();
                    let outcome = service.tick(read, now_ms, &*alarm, &mut events, &mut records);

                    let pause = {
                        let mut snap = lock(&shared);
                        snap.status = service.status(&*alarm);
                        snap.status.running = true;
                        match outcome {
                            TickOutcome::Sampled { point, .. } => {
                                snap.history.record(point);
                                poll_interval
                            }
                            TickOutcome::ReadFailed { .. } => backoff,
                        }
                    };
                    sleep_while_running(&running, pause, poll_interval);
                }

                service.stop(clock.now_ms(), &*alarm, &mut events);
                let mut snap = lock(&shared);
                snap.status = service.status(&*alarm);
                snap.status.running = false;
            })?
        };

        Ok(DetectorHandle {
            running,
            shared,
            alarm,
            observers,
            thread: Some(thread),
        })
    }
}

/// Sleep for `total`, waking every `slice` to check the running flag.
fn sleep_while_running(running: &AtomicBool, total: Duration, slice: Duration) {
    let mut remaining = total;
    while !remaining.is_zero() && running.load(Ordering::Acquire) {
        let step = remaining.min(slice);
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}

// ───────────────────────────────────────────────────────────────
// Handle
// ───────────────────────────────────────────────────────────────

/// Owner of a running detector.  Dropping the handle stops the loop.
pub struct DetectorHandle<A> {
    running: Arc<AtomicBool>,
    shared: Arc<Mutex<Snapshot>>,
    alarm: Arc<A>,
    observers: ObserverRegistry,
    thread: Option<JoinHandle<()>>,
}

impl<A: AlarmPort> DetectorHandle<A> {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Latest published snapshot with live alarm flags.
    pub fn status(&self) -> DetectorStatus {
        let mut status = lock(&self.shared).status.clone();
        let alarm = self.alarm.status();
        status.alarm_active = alarm.active;
        status.alarm_enabled = alarm.enabled;
        status
    }

    pub fn history(&self) -> HistoryReport {
        lock(&self.shared).history.report()
    }

    /// Flip the alarm enabled flag.  Returns the new value.
    pub fn toggle_alarm_enabled(&self) -> bool {
        let enabled = self.alarm.toggle_enabled();
        info!("Alarm {} via handle", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    /// Register an observer on the running loop.  It sees every
    /// transition applied after this call returns.
    pub fn add_callback(&self, observer: impl Observer + 'static) {
        self.observers.register(observer);
    }

    pub fn handle_command(&self, cmd: AppCommand) -> CommandReply {
        match cmd {
            AppCommand::ToggleAlarmEnabled => CommandReply::AlarmEnabled(self.toggle_alarm_enabled()),
            AppCommand::GetStatus => CommandReply::Status(Box::new(self.status())),
            AppCommand::GetHistory => CommandReply::History(self.history()),
        }
    }

    pub fn alarm(&self) -> &Arc<A> {
        &self.alarm
    }
}

impl<A> DetectorHandle<A> {
    /// Stop the loop and wait for it.  The alarm is released on the way
    /// out.  No observer runs after this returns.  Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Polling thread panicked");
            }
        }
    }
}

impl<A> Drop for DetectorHandle<A> {
    fn drop(&mut self) {
        self.stop();
    }
}
