//! Debounce for primary pulses and hold detection for the recall key.

use std::sync::Arc;
use std::time::Instant;

use crate::clock::Clock;
use crate::constants::{HOLD_THRESHOLD, TRIGGER_COOLDOWN};

/// Collapses bursts of primary pulses into at most one trigger per cooldown.
pub struct TriggerGate {
    clock: Arc<dyn Clock>,
    last_fired: Option<Instant>,
}

impl TriggerGate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_fired: None,
        }
    }

    /// Handle one raw pulse. Returns true when it becomes a trigger.
    pub fn on_pulse(&mut self) -> bool {
        let now = self.clock.now();
        if let Some(last) = self.last_fired {
            if now.saturating_duration_since(last) < TRIGGER_COOLDOWN {
                tracing::trace!("Pulse debounced");
                return false;
            }
        }
        self.last_fired = Some(now);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldState {
    Released,
    Held { down_at: Instant },
}

/// Two-state detector that turns a long enough key hold into a recall.
pub struct HoldGestureDetector {
    clock: Arc<dyn Clock>,
    state: HoldState,
}

impl HoldGestureDetector {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: HoldState::Released,
        }
    }

    pub fn is_held(&self) -> bool {
        matches!(self.state, HoldState::Held { .. })
    }

    /// Key pressed. A repeated down while held keeps the first timestamp.
    pub fn on_key_down(&mut self) {
        if self.state == HoldState::Released {
            self.state = HoldState::Held {
                down_at: self.clock.now(),
            };
        }
    }

    /// Key released. Returns true when the hold lasted at least the threshold.
    pub fn on_key_up(&mut self) -> bool {
        match std::mem::replace(&mut self.state, HoldState::Released) {
            HoldState::Held { down_at } => {
                let held = self.clock.now().saturating_duration_since(down_at);
                if held >= HOLD_THRESHOLD {
                    true
                } else {
                    tracing::trace!("Hold of {held:?} ignored as a tap");
                    false
                }
            }
            // Up without a matching down.
            HoldState::Released => false,
        }
    }
}
