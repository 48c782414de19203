//! The engine: wires gestures, capture, scoring, matching and the overlay.
//!
//! A pulse that clears the gate captures a new anchor on the blocking pool.
//! A long enough hold runs one recall as its own task:
//!
//! 1. stop if the buffer is empty
//! 2. decay every record and drop the ones the policy rejects
//! 3. take the highest-confidence record
//! 4. capture the current screen around the cursor
//! 5. correlate the stored anchors against the fresh crop
//! 6. reward or penalise the record
//! 7. on acceptance, show a marker and close it after the dwell time
//!
//! Recalls do not exclude each other; two holds in quick succession run
//! side by side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbImage;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::buffer::AnchorBuffer;
use crate::capture::{ScreenCaptureService, ScreenSource};
use crate::clock::{Clock, SystemClock};
use crate::confidence::ConfidenceEngine;
use crate::constants::MARKER_DWELL;
use crate::gesture::{HoldGestureDetector, TriggerGate};
use crate::input::{InputEvent, InputEventSource, InputSink};
use crate::matcher::{AnchorMatcher, NccMatcher};
use crate::overlay::{MarkerId, OverlayPresenter};
use crate::types::{CaptureError, RecallError, ScreenPoint};

/// A marker that was shown and then closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerShown {
    pub marker: MarkerId,
    pub anchor_id: u64,
    pub position: ScreenPoint,
    pub score: f64,
}

/// Work started by one input event.
pub enum Dispatched {
    Ignored,
    /// Resolves to the new anchor id, or `None` when the capture failed.
    Capture(JoinHandle<Option<u64>>),
    Recall(JoinHandle<Result<MarkerShown, RecallError>>),
}

/// Located anchor waiting to be displayed.
struct Located {
    anchor_id: u64,
    position: ScreenPoint,
    score: f64,
}

/// The parts a recall needs off the input path.
#[derive(Clone)]
struct RecallJob {
    buffer: Arc<AnchorBuffer>,
    confidence: ConfidenceEngine,
    capture: ScreenCaptureService,
    matcher: Arc<dyn AnchorMatcher>,
}

impl RecallJob {
    fn locate(&self) -> Result<Located, RecallError> {
        if self.buffer.is_empty() {
            return Err(RecallError::NoAnchors);
        }

        let pruned = self.buffer.prune(|r| self.confidence.should_prune(r));
        if !pruned.is_empty() {
            tracing::debug!("Pruned anchors {pruned:?}");
        }

        let record = self.buffer.best().ok_or(RecallError::NothingSelected)?;

        let current = self.capture.capture()?;
        let query: &RgbImage = current
            .anchor_images
            .first()
            .ok_or_else(|| CaptureError::InvalidInput("capture produced no anchor".to_string()))?;

        let result = self.matcher.match_anchor(query, &record);
        self.confidence.update(&record, result.accepted);
        tracing::debug!(
            "Anchor {} scored {:.4} (confidence now {:.3}, attempts {})",
            record.id,
            result.score,
            record.confidence(),
            record.attempts()
        );

        if !result.accepted {
            return Err(RecallError::BelowThreshold {
                score: result.score,
            });
        }

        Ok(Located {
            anchor_id: record.id,
            position: record
                .bounds
                .origin()
                .offset(result.x as i32, result.y as i32),
            score: result.score,
        })
    }
}

/// Sole subscriber of the input source; owns every component.
pub struct RecallEngine {
    gate: Mutex<TriggerGate>,
    hold: Mutex<HoldGestureDetector>,
    job: RecallJob,
    overlay: Arc<dyn OverlayPresenter>,
    next_marker: Arc<AtomicU64>,
    runtime: Handle,
}

impl RecallEngine {
    /// Engine with the system clock and the correlation matcher.
    pub fn new(
        screen: Arc<dyn ScreenSource>,
        overlay: Arc<dyn OverlayPresenter>,
        runtime: Handle,
    ) -> Self {
        Self::with_parts(
            screen,
            overlay,
            Arc::new(NccMatcher),
            Arc::new(SystemClock),
            runtime,
        )
    }

    pub fn with_parts(
        screen: Arc<dyn ScreenSource>,
        overlay: Arc<dyn OverlayPresenter>,
        matcher: Arc<dyn AnchorMatcher>,
        clock: Arc<dyn Clock>,
        runtime: Handle,
    ) -> Self {
        Self {
            gate: Mutex::new(TriggerGate::new(clock.clone())),
            hold: Mutex::new(HoldGestureDetector::new(clock.clone())),
            job: RecallJob {
                buffer: Arc::new(AnchorBuffer::new()),
                confidence: ConfidenceEngine::new(clock.clone()),
                capture: ScreenCaptureService::new(screen, clock),
                matcher,
            },
            overlay,
            next_marker: Arc::new(AtomicU64::new(1)),
            runtime,
        }
    }

    /// Register as the only subscriber of `source`.
    pub fn attach(self: &Arc<Self>, source: &dyn InputEventSource) {
        source.subscribe(self.clone());
    }

    pub fn buffer(&self) -> &Arc<AnchorBuffer> {
        &self.job.buffer
    }

    /// Run the gesture logic for one event and start any resulting work.
    /// Never blocks on capture, matching or the dwell.
    pub fn dispatch(&self, event: InputEvent) -> Dispatched {
        match event {
            InputEvent::PrimaryPulse => {
                if self.gate.lock().on_pulse() {
                    Dispatched::Capture(self.spawn_capture())
                } else {
                    Dispatched::Ignored
                }
            }
            InputEvent::HoldDown => {
                self.hold.lock().on_key_down();
                Dispatched::Ignored
            }
            InputEvent::HoldUp => {
                if self.hold.lock().on_key_up() {
                    Dispatched::Recall(self.spawn_recall())
                } else {
                    Dispatched::Ignored
                }
            }
        }
    }

    fn spawn_capture(&self) -> JoinHandle<Option<u64>> {
        let capture = self.job.capture.clone();
        let buffer = self.job.buffer.clone();
        self.runtime
            .spawn_blocking(move || match capture.capture() {
                Ok(record) => {
                    let id = buffer.add(record);
                    tracing::info!("Captured anchor {id} ({} retained)", buffer.len());
                    Some(id)
                }
                Err(e) => {
                    tracing::warn!("Capture skipped: {e}");
                    None
                }
            })
    }

    fn spawn_recall(&self) -> JoinHandle<Result<MarkerShown, RecallError>> {
        let job = self.job.clone();
        let overlay = self.overlay.clone();
        let next_marker = self.next_marker.clone();

        self.runtime.spawn(async move {
            let located = tokio::task::spawn_blocking(move || job.locate())
                .await
                .map_err(|e| RecallError::Task(e.to_string()))
                .and_then(|r| r);

            let located = match located {
                Ok(located) => located,
                Err(e) => {
                    // Failed recalls stay invisible to the user.
                    tracing::debug!("Recall ended without a marker: {e}");
                    return Err(e);
                }
            };

            let marker = MarkerId(next_marker.fetch_add(1, Ordering::SeqCst));
            overlay.show(marker, located.position);
            tracing::info!(
                "Anchor {} found at ({}, {}) with score {:.3}",
                located.anchor_id,
                located.position.x,
                located.position.y,
                located.score
            );
            tokio::time::sleep(MARKER_DWELL).await;
            overlay.close(marker);

            Ok(MarkerShown {
                marker,
                anchor_id: located.anchor_id,
                position: located.position,
                score: located.score,
            })
        })
    }
}

impl InputSink for RecallEngine {
    fn on_input(&self, event: InputEvent) {
        // Detach: the work finishes on its own.
        let _ = self.dispatch(event);
    }
}
