//! Lines the driver writes to stdout.

use serde::Serialize;

use anchor_recall::{AnchorSummary, MarkerId, ScreenPoint};

/// One JSON output line, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    Captured { anchor_id: u64 },
    MarkerShown { marker: MarkerId, at: ScreenPoint },
    MarkerClosed { marker: MarkerId },
    Anchors { anchors: Vec<AnchorSummary> },
    Error { code: i32, message: String },
}
