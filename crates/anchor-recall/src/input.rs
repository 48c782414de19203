//! Input signals and the event-source seam.
//!
//! The engine never talks to OS hooks directly. A source delivers
//! [`InputEvent`]s to a single [`InputSink`], from whatever thread it owns.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Low-level mouse message: left button released.
const MSG_LBUTTON_UP: u32 = 0x0202;
/// Low-level keyboard message: key pressed.
const MSG_KEY_DOWN: u32 = 0x0100;
/// Low-level keyboard message: key released.
const MSG_KEY_UP: u32 = 0x0101;
/// Virtual key used for the hold gesture (Caps Lock).
const VK_HOLD: u32 = 0x14;

/// The three signals the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEvent {
    PrimaryPulse,
    HoldDown,
    HoldUp,
}

/// A raw message as delivered by a process-wide hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawHookMessage {
    Mouse { msg: u32 },
    Keyboard { msg: u32, vk: u32 },
}

impl RawHookMessage {
    /// Map a raw hook message onto an engine signal, if it is one.
    pub fn classify(self) -> Option<InputEvent> {
        match self {
            RawHookMessage::Mouse { msg: MSG_LBUTTON_UP } => Some(InputEvent::PrimaryPulse),
            RawHookMessage::Keyboard {
                msg: MSG_KEY_DOWN,
                vk: VK_HOLD,
            } => Some(InputEvent::HoldDown),
            RawHookMessage::Keyboard {
                msg: MSG_KEY_UP,
                vk: VK_HOLD,
            } => Some(InputEvent::HoldUp),
            _ => None,
        }
    }
}

/// Receiver of input signals. Implementations must return quickly.
pub trait InputSink: Send + Sync {
    fn on_input(&self, event: InputEvent);
}

/// Something that delivers input signals to one subscriber.
pub trait InputEventSource {
    fn subscribe(&self, sink: Arc<dyn InputSink>);
    fn unsubscribe(&self);
}

/// Synchronous emitter: each `emit` calls the subscriber on the caller's thread.
#[derive(Default)]
pub struct ManualInputSource {
    sink: Mutex<Option<Arc<dyn InputSink>>>,
}

impl ManualInputSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one event. Returns false when nobody is subscribed.
    pub fn emit(&self, event: InputEvent) -> bool {
        // Clone out so the sink runs without our lock held.
        let sink = self.sink.lock().clone();
        match sink {
            Some(sink) => {
                sink.on_input(event);
                true
            }
            None => false,
        }
    }

    /// Classify and deliver a raw hook message. Unrecognised messages are dropped.
    pub fn emit_raw(&self, raw: RawHookMessage) -> bool {
        match raw.classify() {
            Some(event) => self.emit(event),
            None => false,
        }
    }
}

impl InputEventSource for ManualInputSource {
    fn subscribe(&self, sink: Arc<dyn InputSink>) {
        *self.sink.lock() = Some(sink);
    }

    fn unsubscribe(&self) {
        *self.sink.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<InputEvent>>);

    impl InputSink for Recorder {
        fn on_input(&self, event: InputEvent) {
            self.0.lock().push(event);
        }
    }

    #[test]
    fn test_classify_raw_messages() {
        assert_eq!(
            RawHookMessage::Mouse { msg: 0x0202 }.classify(),
            Some(InputEvent::PrimaryPulse)
        );
        assert_eq!(RawHookMessage::Mouse { msg: 0x0201 }.classify(), None);
        assert_eq!(
            RawHookMessage::Keyboard { msg: 0x0100, vk: 0x14 }.classify(),
            Some(InputEvent::HoldDown)
        );
        assert_eq!(
            RawHookMessage::Keyboard { msg: 0x0101, vk: 0x14 }.classify(),
            Some(InputEvent::HoldUp)
        );
        assert_eq!(RawHookMessage::Keyboard { msg: 0x0100, vk: 0x41 }.classify(), None);
    }

    #[test]
    fn test_manual_source_delivers_until_unsubscribed() {
        let source = ManualInputSource::new();
        let recorder = Arc::new(Recorder::default());
        assert!(!source.emit(InputEvent::PrimaryPulse));

        source.subscribe(recorder.clone());
        assert!(source.emit(InputEvent::HoldDown));
        assert!(source.emit_raw(RawHookMessage::Keyboard { msg: 0x0101, vk: 0x14 }));
        assert!(!source.emit_raw(RawHookMessage::Mouse { msg: 0x0200 }));

        source.unsubscribe();
        assert!(!source.emit(InputEvent::HoldUp));

        assert_eq!(
            *recorder.0.lock(),
            vec![InputEvent::HoldDown, InputEvent::HoldUp]
        );
    }
}
