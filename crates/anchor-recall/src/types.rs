//! Core data types for anchor records and screen geometry.

use std::time::Instant;

use chrono::{DateTime, Utc};
use image::RgbImage;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::constants::INITIAL_CONFIDENCE;

/// Opaque identifier of a captured window. Never dereferenced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowRef(pub u64);

/// A point in absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by a local offset, saturating at the `i32` range.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// A rectangle in absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }

    /// True when either dimension is zero or negative.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Mutable scoring state of a record. Guarded separately from the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorState {
    pub confidence: f64,
    pub attempts: u32,
}

/// The unit of retained visual memory: anchor crops taken around the cursor.
#[derive(Debug)]
pub struct AnchorRecord {
    pub id: u64,
    pub captured_at: Instant,
    pub captured_wall: DateTime<Utc>,
    pub window: WindowRef,
    pub bounds: ScreenRect,
    pub cursor: ScreenPoint,
    pub anchor_images: Vec<RgbImage>,
    state: Mutex<AnchorState>,
}

impl AnchorRecord {
    /// Create a record with the initial confidence and zero attempts.
    /// The id is assigned when the record enters a buffer.
    pub fn new(
        captured_at: Instant,
        window: WindowRef,
        bounds: ScreenRect,
        cursor: ScreenPoint,
        anchor_images: Vec<RgbImage>,
    ) -> Self {
        Self {
            id: 0,
            captured_at,
            captured_wall: Utc::now(),
            window,
            bounds,
            cursor,
            anchor_images,
            state: Mutex::new(AnchorState {
                confidence: INITIAL_CONFIDENCE,
                attempts: 0,
            }),
        }
    }

    /// Override the starting confidence, clamped to `[0, 1]`.
    pub fn with_confidence(self, confidence: f64) -> Self {
        self.state.lock().confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Override the starting attempt count.
    pub fn with_attempts(self, attempts: u32) -> Self {
        self.state.lock().attempts = attempts;
        self
    }

    pub fn confidence(&self) -> f64 {
        self.state.lock().confidence
    }

    pub fn attempts(&self) -> u32 {
        self.state.lock().attempts
    }

    /// Snapshot of the scoring state.
    pub fn state(&self) -> AnchorState {
        *self.state.lock()
    }

    pub(crate) fn state_mut(&self) -> MutexGuard<'_, AnchorState> {
        self.state.lock()
    }

    /// Serializable view of this record.
    pub fn summary(&self) -> AnchorSummary {
        let state = self.state();
        AnchorSummary {
            id: self.id,
            window: self.window,
            bounds: self.bounds,
            cursor: self.cursor,
            confidence: state.confidence,
            attempts: state.attempts,
            captured_at: self.captured_wall,
            anchor_sizes: self
                .anchor_images
                .iter()
                .map(|img| (img.width(), img.height()))
                .collect(),
        }
    }
}

/// Reporting view of an anchor record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorSummary {
    pub id: u64,
    pub window: WindowRef,
    pub bounds: ScreenRect,
    pub cursor: ScreenPoint,
    pub confidence: f64,
    pub attempts: u32,
    pub captured_at: DateTime<Utc>,
    pub anchor_sizes: Vec<(u32, u32)>,
}

/// Errors raised while capturing the foreground window.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("Empty capture region: {width}x{height}")]
    EmptyRegion { width: i32, height: i32 },

    #[error("Foreground window unavailable: {0}")]
    WindowUnavailable(String),

    #[error("Bitmap is {actual_width}x{actual_height}, window bounds are {expected_width}x{expected_height}")]
    BitmapMismatch {
        expected_width: i32,
        expected_height: i32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Reasons a recall gesture ends without showing a marker.
///
/// None of these reach the user. The engine logs them at debug level and
/// drops them; a rejected match has already been penalised by then.
#[derive(thiserror::Error, Debug)]
pub enum RecallError {
    #[error("No anchors retained")]
    NoAnchors,

    #[error("Every anchor was pruned")]
    NothingSelected,

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Match score {score:.4} below threshold")]
    BelowThreshold { score: f64 },

    #[error("Recall task failed: {0}")]
    Task(String),
}

/// Convenience result type for capture.
pub type CaptureResult<T> = Result<T, CaptureError>;
