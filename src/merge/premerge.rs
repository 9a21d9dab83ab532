//! Pre-merge policy: diarizer turns -> segments sized for the ASR model.
//!
//! Same-speaker turns are accumulated up to a soft `max_duration` ceiling.
//! A running segment shorter than `min_duration` is merged into the next turn
//! even when that turn belongs to another speaker: very short audio starves
//! the ASR model, so speaker purity is traded for transcription quality.
//! The absorbed segment takes the label of the turn it was merged into.
//!
//! A single turn longer than `max_duration` is never split.

use crate::diarization::Turn;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do with a running segment that is shorter than `min_duration`
/// when the next turn cannot be merged normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortSegmentPolicy {
    /// Merge into the next turn regardless of speaker.
    #[default]
    ForceMerge,
    /// Keep the short segment on its own and preserve speaker attribution.
    PreserveSpeaker,
}

/// A run of time-ordered turns transcribed as one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSegment {
    pub start: f64,
    pub end: f64,
    pub speaker_id: String,
    pub source_turns: Vec<Turn>,
}

impl MergedSegment {
    fn from_turn(turn: Turn) -> Self {
        Self {
            start: turn.start,
            end: turn.end,
            speaker_id: turn.speaker_id.clone(),
            source_turns: vec![turn],
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// The segment's span and label as a plain turn.
    pub fn as_turn(&self) -> Turn {
        Turn::new(self.start, self.end, self.speaker_id.clone())
    }

    /// Span length if a region ending at `end` were appended.
    fn span_with(&self, end: f64) -> f64 {
        self.end.max(end) - self.start
    }

    fn absorb(&mut self, turn: Turn) {
        self.end = self.end.max(turn.end);
        self.source_turns.push(turn);
    }

    fn absorb_segment(&mut self, other: MergedSegment) {
        self.end = self.end.max(other.end);
        self.source_turns.extend(other.source_turns);
    }
}

/// Merge turns with the default [`ShortSegmentPolicy::ForceMerge`] policy.
///
/// Turns are expected to be sanitized and sorted by start time.
pub fn premerge(turns: &[Turn], min_duration: f64, max_duration: f64) -> Vec<MergedSegment> {
    premerge_with_policy(turns, min_duration, max_duration, ShortSegmentPolicy::default())
}

/// Merge turns into segments.
///
/// Every segment except possibly the last is at least `min_duration` long
/// under `ForceMerge`. The output is a fixed point: feeding each segment back
/// in as a turn produces the same spans.
pub fn premerge_with_policy(
    turns: &[Turn],
    min_duration: f64,
    max_duration: f64,
    policy: ShortSegmentPolicy,
) -> Vec<MergedSegment> {
    let mut merged: Vec<MergedSegment> = Vec::new();
    let mut running: Option<MergedSegment> = None;
    let mut forced = 0usize;

    for turn in turns {
        let Some(current) = running.as_mut() else {
            running = Some(MergedSegment::from_turn(turn.clone()));
            continue;
        };

        if current.speaker_id == turn.speaker_id && current.span_with(turn.end) <= max_duration {
            current.absorb(turn.clone());
        } else if policy == ShortSegmentPolicy::ForceMerge && current.duration() < min_duration {
            forced += 1;
            current.speaker_id = turn.speaker_id.clone();
            current.absorb(turn.clone());
        } else {
            if let Some(done) = running.take() {
                flush(&mut merged, done, max_duration);
            }
            running = Some(MergedSegment::from_turn(turn.clone()));
        }
    }

    if let Some(done) = running {
        flush(&mut merged, done, max_duration);
    }

    debug!(
        turns = turns.len(),
        segments = merged.len(),
        forced_merges = forced,
        "premerged turns"
    );
    merged
}

/// Append a finished segment, folding it into the previous one when a forced
/// merge left two mergeable same-speaker segments side by side.
fn flush(merged: &mut Vec<MergedSegment>, segment: MergedSegment, max_duration: f64) {
    if let Some(last) = merged.last_mut()
        && last.speaker_id == segment.speaker_id
        && last.span_with(segment.end) <= max_duration
    {
        last.absorb_segment(segment);
        return;
    }
    merged.push(segment);
}
