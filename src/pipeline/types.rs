//! Value types passed between pipeline stages.

use crate::error::DiarflowError;
use crate::merge::{FinalSegment, MergedSegment};
use crate::stt::WordTiming;
use serde::Serialize;

/// Transcription of one merged segment.
///
/// Word timings are absolute (seconds into the source audio).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentResult {
    pub segment: MergedSegment,
    pub text: String,
    pub words: Vec<WordTiming>,
}

impl SegmentResult {
    pub fn new(segment: MergedSegment, text: impl Into<String>) -> Self {
        Self {
            segment,
            text: text.into(),
            words: Vec::new(),
        }
    }

    pub fn with_words(mut self, words: Vec<WordTiming>) -> Self {
        self.words = words;
        self
    }
}

/// A segment whose worker returned an error, panicked or timed out.
#[derive(Debug)]
pub struct SegmentFailure {
    /// Position of the segment in the dispatched batch.
    pub index: usize,
    pub segment: MergedSegment,
    pub error: DiarflowError,
}

impl SegmentFailure {
    pub fn summary(&self) -> FailureSummary {
        FailureSummary {
            start: self.segment.start,
            end: self.segment.end,
            speaker_id: self.segment.speaker_id.clone(),
            error: self.error.to_string(),
        }
    }
}

/// Outcome of dispatching a batch of segments.
///
/// Both lists are ordered by submission index. Every dispatched segment
/// appears in exactly one of them.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub succeeded: Vec<SegmentResult>,
    pub failed: Vec<SegmentFailure>,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Serializable description of a dropped segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSummary {
    pub start: f64,
    pub end: f64,
    pub speaker_id: String,
    pub error: String,
}

/// Final pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub segments: Vec<FinalSegment>,
    /// Segments missing from `segments` because their worker failed.
    pub failures: Vec<FailureSummary>,
    pub duration_secs: f64,
}

impl Transcript {
    /// Distinct speaker ids in order of first appearance.
    pub fn speakers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if !seen.contains(&segment.speaker_id.as_str()) {
                seen.push(&segment.speaker_id);
            }
        }
        seen
    }

    /// Plain text of all segments, one per line.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
