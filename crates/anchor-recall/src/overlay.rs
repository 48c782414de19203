//! Transient location marker boundary.

use serde::{Deserialize, Serialize};

use crate::types::ScreenPoint;

/// Identifies one shown marker so overlapping recalls close their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

/// A non-interactive marker drawn at absolute screen coordinates.
///
/// The engine pairs every `show` with a `close` for the same id after the
/// dwell time. Both calls must return promptly.
pub trait OverlayPresenter: Send + Sync {
    fn show(&self, marker: MarkerId, at: ScreenPoint);
    fn close(&self, marker: MarkerId);
}
