//! Fixed behavioural constants. None of these are runtime-configurable.

use std::time::Duration;

/// Minimum spacing between two accepted primary pulses.
pub const TRIGGER_COOLDOWN: Duration = Duration::from_millis(700);

/// Minimum hold duration for a hold gesture to count as a recall.
pub const HOLD_THRESHOLD: Duration = Duration::from_millis(400);

/// Maximum number of anchor records retained.
pub const MAX_ANCHORS: usize = 25;

/// Confidence assigned to a freshly captured record.
pub const INITIAL_CONFIDENCE: f64 = 0.6;

/// Confidence added on a successful match.
pub const MATCH_REWARD: f64 = 0.15;

/// Confidence removed on a rejected match.
pub const MATCH_PENALTY: f64 = 0.25;

/// Confidence removed per second of record age, every time a prune scan visits it.
pub const DECAY_PER_SECOND: f64 = 0.005;

/// Records at or below this confidence are pruned.
pub const PRUNE_CONFIDENCE: f64 = 0.1;

/// Records older than this many seconds are pruned.
pub const PRUNE_AGE_SECS: f64 = 60.0;

/// Records with more attempts than this are pruned.
pub const PRUNE_ATTEMPTS: u32 = 2;

/// Minimum correlation score for a match to be accepted.
pub const MATCH_THRESHOLD: f64 = 0.75;

/// How long a location marker stays on screen.
pub const MARKER_DWELL: Duration = Duration::from_millis(2000);

/// Maximum edge length of an anchor crop.
pub const ANCHOR_EDGE: u32 = 64;

/// Offset from the cursor to the anchor origin on each axis.
pub const ANCHOR_HALF_EDGE: i32 = 32;
