//! Scoring, decay and prune policy for anchor records.

use std::sync::Arc;

use crate::clock::Clock;
use crate::constants::{
    DECAY_PER_SECOND, MATCH_PENALTY, MATCH_REWARD, PRUNE_AGE_SECS, PRUNE_ATTEMPTS,
    PRUNE_CONFIDENCE,
};
use crate::types::AnchorRecord;

/// Applies reward, penalty and age decay to records in place.
#[derive(Clone)]
pub struct ConfidenceEngine {
    clock: Arc<dyn Clock>,
}

impl ConfidenceEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Reward or penalise a record after a match attempt and count the attempt.
    pub fn update(&self, record: &AnchorRecord, success: bool) {
        let mut state = record.state_mut();
        let delta = if success { MATCH_REWARD } else { -MATCH_PENALTY };
        state.confidence = (state.confidence + delta).clamp(0.0, 1.0);
        state.attempts = state.attempts.saturating_add(1);
    }

    /// Decay the record by its age and decide whether it should be dropped.
    ///
    /// The decay is applied on every call, not once per record: scanning the
    /// same record twice lowers its confidence twice.
    pub fn should_prune(&self, record: &AnchorRecord) -> bool {
        let age = self
            .clock
            .now()
            .saturating_duration_since(record.captured_at)
            .as_secs_f64();

        let mut state = record.state_mut();
        state.confidence = (state.confidence - age * DECAY_PER_SECOND).clamp(0.0, 1.0);

        let prune = state.confidence <= PRUNE_CONFIDENCE
            || age > PRUNE_AGE_SECS
            || state.attempts > PRUNE_ATTEMPTS;
        if prune {
            tracing::debug!(
                "Pruning anchor {} (confidence {:.3}, age {:.1}s, attempts {})",
                record.id,
                state.confidence,
                age,
                state.attempts
            );
        }
        prune
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{ScreenPoint, ScreenRect, WindowRef};
    use image::RgbImage;
    use std::time::Duration;

    fn setup() -> (Arc<ManualClock>, ConfidenceEngine) {
        let clock = Arc::new(ManualClock::new());
        let engine = ConfidenceEngine::new(clock.clone());
        (clock, engine)
    }

    fn record(clock: &ManualClock) -> AnchorRecord {
        AnchorRecord::new(
            clock.now(),
            WindowRef(1),
            ScreenRect::new(0, 0, 100, 100),
            ScreenPoint::new(10, 10),
            vec![RgbImage::new(8, 8)],
        )
    }

    #[test]
    fn test_update_success_and_failure() {
        let (clock, engine) = setup();
        let r = record(&clock);
        engine.update(&r, true);
        assert!((r.confidence() - 0.75).abs() < 1e-9);
        assert_eq!(r.attempts(), 1);

        let r = record(&clock);
        engine.update(&r, false);
        assert!((r.confidence() - 0.35).abs() < 1e-9);
        assert_eq!(r.attempts(), 1);
    }

    #[test]
    fn test_update_stays_within_bounds() {
        let (clock, engine) = setup();
        let r = record(&clock);
        let pattern = [true, true, true, true, false, true, false, false, false, false, true];
        let mut last_attempts = 0;
        for success in pattern {
            engine.update(&r, success);
            let c = r.confidence();
            assert!((0.0..=1.0).contains(&c));
            assert!(r.attempts() > last_attempts);
            last_attempts = r.attempts();
        }
        assert_eq!(r.attempts(), pattern.len() as u32);
    }

    #[test]
    fn test_fresh_record_is_kept() {
        let (clock, engine) = setup();
        let r = record(&clock);
        clock.advance(Duration::from_secs(1));
        assert!(!engine.should_prune(&r));
        assert!((r.confidence() - 0.595).abs() < 1e-9);
    }

    #[test]
    fn test_low_confidence_prunes_regardless() {
        let (clock, engine) = setup();
        let r = record(&clock).with_confidence(0.05);
        assert!(engine.should_prune(&r));
    }

    #[test]
    fn test_old_record_prunes_regardless() {
        let (clock, engine) = setup();
        let r = record(&clock).with_confidence(1.0);
        clock.advance(Duration::from_secs(61));
        assert!(engine.should_prune(&r));
    }

    #[test]
    fn test_attempts_prune_regardless() {
        let (clock, engine) = setup();
        let r = record(&clock).with_confidence(1.0).with_attempts(3);
        assert!(engine.should_prune(&r));

        let r = record(&clock).with_confidence(1.0).with_attempts(2);
        assert!(!engine.should_prune(&r));
    }

    #[test]
    fn test_decay_reapplies_on_every_scan() {
        let (clock, engine) = setup();
        let r = record(&clock);
        clock.advance(Duration::from_secs(10));
        assert!(!engine.should_prune(&r));
        assert!((r.confidence() - 0.55).abs() < 1e-9);
        assert!(!engine.should_prune(&r));
        assert!((r.confidence() - 0.50).abs() < 1e-9);
    }
}
