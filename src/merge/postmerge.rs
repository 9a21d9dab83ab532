//! Post-merge: per-segment results -> consecutive-speaker transcript turns.
//!
//! Results may arrive in any order, so they are re-sorted by start time
//! before coalescing. Adjacent results with the same speaker are joined no
//! matter how much silence separates them.

use crate::pipeline::types::SegmentResult;
use crate::stt::WordTiming;
use serde::Serialize;

/// One speaker turn of the final transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalSegment {
    pub start: f64,
    pub end: f64,
    pub speaker_id: String,
    pub text: String,
    pub words: Vec<WordTiming>,
}

impl FinalSegment {
    fn extend(&mut self, result: SegmentResult) {
        self.end = self.end.max(result.segment.end);
        let text = result.text.trim();
        if !text.is_empty() {
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(text);
        }
        self.words.extend(result.words);
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl From<SegmentResult> for FinalSegment {
    fn from(result: SegmentResult) -> Self {
        Self {
            start: result.segment.start,
            end: result.segment.end,
            speaker_id: result.segment.speaker_id,
            text: result.text.trim().to_string(),
            words: result.words,
        }
    }
}

/// Sort results by start (stable, so ties keep input order) and coalesce
/// consecutive same-speaker entries.
pub fn postmerge(results: Vec<SegmentResult>) -> Vec<FinalSegment> {
    let mut ordered = results;
    ordered.sort_by(|a, b| a.segment.start.total_cmp(&b.segment.start));

    let mut finals: Vec<FinalSegment> = Vec::with_capacity(ordered.len());
    for result in ordered {
        match finals.last_mut() {
            Some(last) if last.speaker_id == result.segment.speaker_id => last.extend(result),
            _ => finals.push(FinalSegment::from(result)),
        }
    }
    finals
}
