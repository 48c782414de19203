//! Core engine for capturing cursor anchors, ranking them by
//! confidence, and relocating them on screen by template correlation.

pub mod buffer;
pub mod capture;
pub mod clock;
pub mod confidence;
pub mod constants;
pub mod gesture;
pub mod input;
pub mod matcher;
pub mod overlay;
pub mod recall;
pub mod types;

pub use buffer::AnchorBuffer;
pub use capture::{
    capture_from_base64, capture_from_file, crop_anchor, ScreenCaptureService, ScreenSource,
    ScriptedScreen, WindowSnapshot,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use confidence::ConfidenceEngine;
pub use gesture::{HoldGestureDetector, TriggerGate};
pub use input::{InputEvent, InputEventSource, InputSink, ManualInputSource, RawHookMessage};
pub use matcher::{normalized_cross_correlation, AnchorMatcher, MatchResult, NccMatcher};
pub use overlay::{MarkerId, OverlayPresenter};
pub use recall::{Dispatched, MarkerShown, RecallEngine};
pub use types::*;
