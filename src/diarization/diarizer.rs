use crate::audio::Waveform;
use crate::diarization::turn::Turn;
use crate::error::{DiarflowError, Result};

/// Trait for "who spoke when" analysis.
///
/// Implementations wrap an external diarization model (clustering or
/// end-to-end) and are interchangeable.
pub trait Diarizer: Send + Sync {
    /// Return time-ordered speaker turns for the waveform.
    fn diarize(&self, waveform: &Waveform) -> Result<Vec<Turn>>;

    /// Name for logging/diagnostics.
    fn name(&self) -> &str;
}

/// Diarizer that always returns the same turns regardless of audio.
///
/// Used when turns were computed ahead of time.
#[derive(Debug, Clone)]
pub struct StaticDiarizer {
    turns: Vec<Turn>,
    name: String,
}

impl StaticDiarizer {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns,
            name: "static".to_string(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }
}

impl Diarizer for StaticDiarizer {
    fn diarize(&self, _waveform: &Waveform) -> Result<Vec<Turn>> {
        Ok(self.turns.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Mock diarizer for testing
#[derive(Debug, Clone, Default)]
pub struct MockDiarizer {
    turns: Vec<Turn>,
    should_fail: bool,
}

impl MockDiarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to return specific turns
    pub fn with_turns(mut self, turns: Vec<Turn>) -> Self {
        self.turns = turns;
        self
    }

    /// Configure the mock to fail on diarize
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Diarizer for MockDiarizer {
    fn diarize(&self, _waveform: &Waveform) -> Result<Vec<Turn>> {
        if self.should_fail {
            Err(DiarflowError::Diarization {
                message: "mock diarization failure".to_string(),
            })
        } else {
            Ok(self.turns.clone())
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_diarizer_ignores_audio() {
        let turns = vec![Turn::new(0.0, 1.0, "A"), Turn::new(1.0, 2.0, "B")];
        let diarizer = StaticDiarizer::new(turns.clone()).with_name("precomputed");

        assert_eq!(diarizer.diarize(&Waveform::silence(0.1, 16000)).unwrap(), turns);
        assert_eq!(diarizer.name(), "precomputed");
    }

    #[test]
    fn mock_diarizer_failure() {
        let diarizer = MockDiarizer::new().with_failure();
        match diarizer.diarize(&Waveform::silence(1.0, 16000)) {
            Err(DiarflowError::Diarization { message }) => {
                assert_eq!(message, "mock diarization failure");
            }
            other => panic!("Expected Diarization error, got {:?}", other),
        }
    }

    #[test]
    fn diarizer_trait_is_object_safe() {
        let diarizer: Box<dyn Diarizer> =
            Box::new(MockDiarizer::new().with_turns(vec![Turn::new(0.0, 2.0, "A")]));
        assert_eq!(diarizer.name(), "mock");
        assert_eq!(diarizer.diarize(&Waveform::silence(2.0, 16000)).unwrap().len(), 1);
    }
}
