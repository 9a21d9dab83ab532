//! Forced-alignment adapters: known text + audio -> per-word timestamps.

use crate::error::{DiarflowError, Result};
use serde::{Deserialize, Serialize};

/// One aligned word, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }

    /// Shift both bounds by `offset` seconds.
    pub fn shifted(mut self, offset: f64) -> Self {
        self.start += offset;
        self.end += offset;
        self
    }
}

/// Trait for forced alignment.
///
/// Timings are relative to the start of `audio`.
pub trait Aligner: Send + Sync {
    fn align(&self, audio: &[i16], sample_rate: u32, text: &str) -> Result<Vec<WordTiming>>;

    /// Name for logging/diagnostics.
    fn name(&self) -> &str;
}

/// Aligner that never produces timings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAligner;

impl Aligner for NoopAligner {
    fn align(&self, _audio: &[i16], _sample_rate: u32, _text: &str) -> Result<Vec<WordTiming>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Mock aligner that spreads words evenly over the audio.
#[derive(Debug, Clone, Default)]
pub struct MockAligner {
    should_fail: bool,
}

impl MockAligner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Aligner for MockAligner {
    fn align(&self, audio: &[i16], sample_rate: u32, text: &str) -> Result<Vec<WordTiming>> {
        if self.should_fail {
            return Err(DiarflowError::Alignment {
                message: "mock alignment failure".to_string(),
            });
        }
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() || sample_rate == 0 {
            return Ok(Vec::new());
        }
        let duration = audio.len() as f64 / sample_rate as f64;
        let step = duration / words.len() as f64;
        Ok(words
            .iter()
            .enumerate()
            .map(|(i, w)| WordTiming::new(*w, i as f64 * step, (i + 1) as f64 * step))
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
