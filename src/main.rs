//! SmokeWatch firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  DigitalSmokeSensor  AlarmOutput   LogEventSink  ReadingLog  │
//! │  (SensorPort)        (AlarmPort)   (EventSink)   (RecordSink)│
//! │  JsonConfigFile      MonotonicClock                          │
//! │  (ConfigPort)        (Clock)                                 │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │        DetectorService (polling thread)            │      │
//! │  │  Window · Filter · Estimator · Arbiter             │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use esp_idf_hal::gpio::{AnyIOPin, PinDriver, Pull};
use log::{info, warn};

use smokewatch::adapters::config_file::JsonConfigFile;
use smokewatch::adapters::log_sink::LogEventSink;
use smokewatch::adapters::record_log::{BackgroundRecordSink, ReadingLog, RecordFormat};
use smokewatch::app::ports::ConfigPort;
use smokewatch::config::InputMode;
use smokewatch::drivers::AlarmOutput;
use smokewatch::sensors::DigitalSmokeSensor;
use smokewatch::{Detector, DetectorConfig};

const CONFIG_PATH: &str = "/spiffs/smokewatch.json";
const READING_LOG_PATH: &str = "/spiffs/readings.csv";
const RECORD_QUEUE: usize = 64;
const STATUS_EVERY: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("SmokeWatch v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config (file or defaults) ──────────────────────────
    let config = match JsonConfigFile::new(CONFIG_PATH).load() {
        Ok(c) => c,
        Err(e) => {
            warn!("Config load failed ({}), running with defaults", e);
            DetectorConfig::default()
        }
    };
    if config.input_mode == InputMode::Analog {
        bail!("analog input needs a board-specific ADC channel; set input_mode to digital");
    }

    // ── 3. GPIO ───────────────────────────────────────────────
    // SAFETY: the two pin numbers are validated, distinct, and not claimed
    // by any other driver in this binary.
    let sensor_pin = unsafe { AnyIOPin::new(config.sensor_pin) };
    let alarm_pin = unsafe { AnyIOPin::new(config.alarm_pin) };

    let mut input = PinDriver::input(sensor_pin)?;
    input.set_pull(if config.active_high { Pull::Down } else { Pull::Up })?;
    let sensor = DigitalSmokeSensor::new(input, config.active_high);

    let output = PinDriver::output(alarm_pin)?;
    let alarm = Arc::new(AlarmOutput::new(output).map_err(anyhow::Error::msg)?);

    // ── 4. Detector ───────────────────────────────────────────
    let mut detector = Detector::new(config, sensor, alarm)?.with_event_sink(LogEventSink::new());
    match ReadingLog::append_to(READING_LOG_PATH, RecordFormat::Csv)
        .and_then(|log| BackgroundRecordSink::spawn(log, RECORD_QUEUE))
    {
        Ok(sink) => detector = detector.with_record_sink(sink),
        Err(e) => warn!("Reading log unavailable: {}", e),
    }
    detector.add_callback(|smoke: bool| {
        info!("Smoke state: {}", if smoke { "DETECTED" } else { "clear" });
    });

    let handle = detector.start()?;

    // ── 5. Supervise ──────────────────────────────────────────
    loop {
        std::thread::sleep(STATUS_EVERY);
        let status = handle.status();
        info!(
            "STATUS | smoke={:?} filtered={:?} alarm={}/{} degraded={} polls={}",
            status.smoke_detected,
            status.filtered_value,
            if status.alarm_active { "ON" } else { "off" },
            if status.alarm_enabled { "armed" } else { "disabled" },
            status.sensor_degraded,
            status.metrics.polls,
        );
    }
}
