//! Append-only reading log.
//!
//! [`ReadingLog`] writes one line per [`PollRecord`] as CSV (with a
//! header on a fresh file) or JSON lines.  Used directly it is a
//! synchronous [`RecordSink`]; wrapped in a [`BackgroundRecordSink`] the
//! writes happen on their own thread behind a bounded channel, so a slow
//! SD card or flash FS never stalls the polling loop.  Records that do
//! not fit in the channel are dropped and counted.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::JoinHandle;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::events::PollRecord;
use crate::app::ports::RecordSink;
use crate::drivers::task_pin::{RECORD_TASK, spawn_task};

pub const CSV_HEADER: &str = "timestamp,raw_reading,stable_state,window_average,alarm_active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    #[default]
    Csv,
    JsonLines,
}

pub struct ReadingLog<W: Write> {
    out: W,
    format: RecordFormat,
    needs_header: bool,
    failed: u64,
}

impl<W: Write> ReadingLog<W> {
    /// Log into `out`, which is assumed empty (a CSV header is written
    /// before the first record).
    pub fn new(out: W, format: RecordFormat) -> Self {
        Self {
            out,
            format,
            needs_header: format == RecordFormat::Csv,
            failed: 0,
        }
    }

    pub fn write(&mut self, record: &PollRecord) -> io::Result<()> {
        if self.needs_header {
            writeln!(self.out, "{}", CSV_HEADER)?;
            self.needs_header = false;
        }
        match self.format {
            RecordFormat::Csv => {
                let avg = record
                    .window_average
                    .map(|a| format!("{:.4}", a))
                    .unwrap_or_default();
                writeln!(
                    self.out,
                    "{},{:.4},{},{},{}",
                    record.timestamp_ms, record.raw_reading, record.stable_state, avg, record.alarm_active
                )?;
            }
            RecordFormat::JsonLines => {
                serde_json::to_writer(&mut self.out, record)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ReadingLog<BufWriter<std::fs::File>> {
    /// Open `path` for appending.  The CSV header is only written when the
    /// file is new or empty.
    pub fn append_to(path: impl AsRef<Path>, format: RecordFormat) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let empty = file.metadata()?.len() == 0;
        info!("Reading log at {} ({:?})", path.display(), format);
        let mut log = Self::new(BufWriter::new(file), format);
        log.needs_header &= empty;
        Ok(log)
    }
}

impl<W: Write> RecordSink for ReadingLog<W> {
    fn append(&mut self, record: &PollRecord) {
        if let Err(e) = self.write(record) {
            self.failed += 1;
            warn!("Error logging reading: {}", e);
        }
    }

    fn dropped(&self) -> u64 {
        self.failed
    }
}

/// Forwards records to a [`ReadingLog`] running on its own thread.
pub struct BackgroundRecordSink {
    tx: Option<SyncSender<PollRecord>>,
    dropped: Arc<AtomicU64>,
    writer: Option<JoinHandle<()>>,
}

impl BackgroundRecordSink {
    /// Spawn the writer thread with a queue of `capacity` records.
    pub fn spawn<W>(mut log: ReadingLog<W>, capacity: usize) -> io::Result<Self>
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<PollRecord>(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let writer = {
            let dropped = Arc::clone(&dropped);
            spawn_task(RECORD_TASK, move || {
                for record in rx {
                    if let Err(e) = log.write(&record) {
                        dropped.fetch_add(1, Ordering::Relaxed);
                        warn!("Error logging reading: {}", e);
                    }
                }
            })?
        };
        Ok(Self {
            tx: Some(tx),
            dropped,
            writer: Some(writer),
        })
    }
}

impl RecordSink for BackgroundRecordSink {
    fn append(&mut self, record: &PollRecord) {
        let Some(tx) = &self.tx else { return };
        match tx.try_send(*record) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for BackgroundRecordSink {
    /// Close the queue and wait for queued records to be written.
    fn drop(&mut self) {
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                error!("Reading log writer panicked");
            }
        }
    }
}
