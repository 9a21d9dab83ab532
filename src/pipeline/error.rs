//! Reporting of per-segment failures.

use crate::pipeline::types::SegmentFailure;
use std::sync::Mutex;
use tracing::warn;

/// Trait for reporting segments that could not be transcribed.
pub trait ErrorReporter: Send + Sync {
    /// Reports a failure from a pipeline stage.
    fn report(&self, stage: &str, failure: &SegmentFailure);
}

/// Reporter that emits a structured warning per failed segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, stage: &str, failure: &SegmentFailure) {
        warn!(
            stage,
            index = failure.index,
            speaker = %failure.segment.speaker_id,
            start = failure.segment.start,
            end = failure.segment.end,
            error = %failure.error,
            "segment failed"
        );
    }
}

/// Reporter that keeps every report in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<(String, usize, String)>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(stage, segment index, error message)` in report order.
    pub fn reports(&self) -> Vec<(String, usize, String)> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, stage: &str, failure: &SegmentFailure) {
        let entry = (stage.to_string(), failure.index, failure.error.to_string());
        match self.reports.lock() {
            Ok(mut reports) => reports.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
