//! Inbound commands to the detector.
//!
//! These represent requests from the outside world (a web socket, a
//! serial console, a button) that the
//! [`DetectorHandle`](crate::detector::DetectorHandle) interprets.  The
//! transport maps its own messages onto these.

use serde::{Deserialize, Serialize};

use super::history::HistoryReport;
use super::status::DetectorStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppCommand {
    /// Flip the alarm enabled flag.  Disabling silences an active alarm.
    ToggleAlarmEnabled,

    /// Return the current status snapshot.
    GetStatus,

    /// Return the retained data points and their summary.
    GetHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CommandReply {
    AlarmEnabled(bool),
    Status(Box<DetectorStatus>),
    History(HistoryReport),
}
