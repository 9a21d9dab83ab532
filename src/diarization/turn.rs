//! Speaker turns and ingestion-time sanitization.

use crate::defaults::TURN_EPSILON_SECS;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A single diarizer-reported `(start, end, speaker)` interval, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub start: f64,
    pub end: f64,
    pub speaker_id: String,
}

impl Turn {
    pub fn new(start: f64, end: f64, speaker_id: impl Into<String>) -> Self {
        Self {
            start,
            end,
            speaker_id: speaker_id.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Correct lightly malformed diarizer output instead of rejecting it.
///
/// - turns with non-finite timestamps are dropped
/// - negative timestamps are clamped to zero
/// - `end <= start` is widened to `start + TURN_EPSILON_SECS`
/// - the result is stably sorted by start time
///
/// Overlapping turns are kept as they are.
pub fn sanitize_turns(turns: Vec<Turn>) -> Vec<Turn> {
    let input_len = turns.len();
    let mut clean: Vec<Turn> = Vec::with_capacity(input_len);

    for mut turn in turns {
        if !turn.start.is_finite() || !turn.end.is_finite() {
            warn!(
                start = turn.start,
                end = turn.end,
                speaker = %turn.speaker_id,
                "dropping turn with non-finite timestamp"
            );
            continue;
        }
        turn.start = turn.start.max(0.0);
        turn.end = turn.end.max(0.0);
        if turn.end <= turn.start {
            debug!(
                start = turn.start,
                end = turn.end,
                speaker = %turn.speaker_id,
                "widening degenerate turn"
            );
            turn.end = turn.start + TURN_EPSILON_SECS;
        }
        clean.push(turn);
    }

    clean.sort_by(|a, b| a.start.total_cmp(&b.start));

    if clean.len() != input_len {
        debug!(kept = clean.len(), dropped = input_len - clean.len(), "sanitized turns");
    }
    clean
}
