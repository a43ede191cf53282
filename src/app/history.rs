//! Rolling history of detector data points and its summary.
//!
//! Keeps the last [`HISTORY_CAP`] points in a ring buffer that overwrites
//! the oldest entry.  The transport layer reads the full dataset plus a
//! summary for charting.

use heapless::HistoryBuffer;
use serde::Serialize;

/// Number of data points retained.
pub const HISTORY_CAP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataPoint {
    pub timestamp_ms: u64,
    pub smoke_detected: bool,
    pub alarm_active: bool,
    pub alarm_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct HistorySummary {
    /// Data points with smoke detected.
    pub smoke_detections: usize,
    /// Data points with the alarm sounding.
    pub alarm_activations: usize,
    /// Time spanned by the retained points.
    pub uptime_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryReport {
    pub data: Vec<DataPoint>,
    pub summary: HistorySummary,
}

pub struct DataHistory {
    points: HistoryBuffer<DataPoint, HISTORY_CAP>,
}

impl Default for DataHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl DataHistory {
    pub fn new() -> Self {
        Self {
            points: HistoryBuffer::new(),
        }
    }

    pub fn record(&mut self, point: DataPoint) {
        self.points.write(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.len() == 0
    }

    pub fn latest(&self) -> Option<&DataPoint> {
        self.points.recent()
    }

    pub fn summary(&self) -> HistorySummary {
        let mut summary = HistorySummary::default();
        let mut first = None;
        let mut last = None;
        for p in self.points.oldest_ordered() {
            first.get_or_insert(p.timestamp_ms);
            last = Some(p.timestamp_ms);
            summary.smoke_detections += usize::from(p.smoke_detected);
            summary.alarm_activations += usize::from(p.alarm_active);
        }
        if let (Some(first), Some(last)) = (first, last) {
            summary.uptime_secs = last.saturating_sub(first) as f64 / 1000.0;
        }
        summary
    }

    /// Full dataset, oldest first, with its summary.
    pub fn report(&self) -> HistoryReport {
        HistoryReport {
            data: self.points.oldest_ordered().copied().collect(),
            summary: self.summary(),
        }
    }
}
