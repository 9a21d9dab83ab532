//! Per-segment worker: extract, transcribe, optionally align.

use crate::audio::waveform::{Waveform, padded_window, slice_window};
use crate::defaults;
use crate::error::Result;
use crate::merge::MergedSegment;
use crate::pipeline::types::SegmentResult;
use crate::stt::{Aligner, Transcriber, WordTiming};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns one merged segment into a [`SegmentResult`].
///
/// The worker holds only shared read-only handles, so a single instance is
/// used by every dispatch thread.
pub struct SegmentWorker {
    transcriber: Arc<dyn Transcriber>,
    aligner: Option<Arc<dyn Aligner>>,
    padding_secs: f64,
    align_min_duration_secs: f64,
}

impl SegmentWorker {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            aligner: None,
            padding_secs: defaults::PADDING_SECS,
            align_min_duration_secs: defaults::ALIGN_MIN_SECS,
        }
    }

    pub fn with_aligner(mut self, aligner: Arc<dyn Aligner>) -> Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn with_padding(mut self, padding_secs: f64) -> Self {
        self.padding_secs = padding_secs;
        self
    }

    /// Segments shorter than this skip alignment.
    pub fn with_align_min_duration(mut self, secs: f64) -> Self {
        self.align_min_duration_secs = secs;
        self
    }

    pub fn model_name(&self) -> &str {
        self.transcriber.model_name()
    }

    pub fn padding_secs(&self) -> f64 {
        self.padding_secs
    }

    /// Transcribe `segment` from `waveform`.
    ///
    /// Transcription and alignment errors fail the segment. The returned
    /// word timings are absolute within `waveform`.
    pub fn run(&self, waveform: &Waveform, segment: &MergedSegment) -> Result<SegmentResult> {
        let window = padded_window(
            waveform.duration_secs(),
            segment.start,
            segment.end,
            self.padding_secs,
        )?;
        let audio = slice_window(waveform, window);

        if audio.is_empty() {
            warn!(
                speaker = %segment.speaker_id,
                start = segment.start,
                end = segment.end,
                "segment window is empty, skipping inference"
            );
            return Ok(SegmentResult::new(segment.clone(), String::new()));
        }

        let text = self.transcriber.transcribe(&audio.samples)?.trim().to_string();
        let words = self.align(&audio, segment, &text, window.start)?;

        debug!(
            speaker = %segment.speaker_id,
            start = segment.start,
            end = segment.end,
            window_secs = window.duration(),
            chars = text.len(),
            words = words.len(),
            "segment transcribed"
        );

        Ok(SegmentResult::new(segment.clone(), text).with_words(words))
    }

    fn align(
        &self,
        audio: &Waveform,
        segment: &MergedSegment,
        text: &str,
        offset: f64,
    ) -> Result<Vec<WordTiming>> {
        let Some(aligner) = &self.aligner else {
            return Ok(Vec::new());
        };
        if text.is_empty() || segment.duration() < self.align_min_duration_secs {
            return Ok(Vec::new());
        }
        let words = aligner.align(&audio.samples, audio.sample_rate, text)?;
        Ok(words.into_iter().map(|w| w.shifted(offset)).collect())
    }
}

impl std::fmt::Debug for SegmentWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWorker")
            .field("model", &self.transcriber.model_name())
            .field("aligner", &self.aligner.as_ref().map(|a| a.name().to_string()))
            .field("padding_secs", &self.padding_secs)
            .field("align_min_duration_secs", &self.align_min_duration_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diarization::Turn;
    use crate::error::DiarflowError;
    use crate::merge::premerge;
    use crate::stt::{MockAligner, MockTranscriber};

    fn segment(start: f64, end: f64) -> MergedSegment {
        premerge(&[Turn::new(start, end, "A")], 0.0, 30.0).remove(0)
    }

    fn worker(response: &str) -> SegmentWorker {
        SegmentWorker::new(Arc::new(MockTranscriber::new("mock").with_response(response)))
    }

    #[test]
    fn test_transcribes_and_trims() {
        let waveform = Waveform::silence(5.0, 16000);
        let result = worker("  hello world ").run(&waveform, &segment(1.0, 3.0)).unwrap();
        assert_eq!(result.text, "hello world");
        assert_eq!(result.segment.start, 1.0);
        assert!(result.words.is_empty());
    }

    #[test]
    fn test_transcription_error_propagates() {
        let waveform = Waveform::silence(5.0, 16000);
        let worker = SegmentWorker::new(Arc::new(MockTranscriber::new("mock").with_failure()));
        match worker.run(&waveform, &segment(1.0, 3.0)) {
            Err(DiarflowError::Transcription { .. }) => {}
            other => panic!("Expected Transcription error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_padding_is_rejected() {
        let waveform = Waveform::silence(5.0, 16000);
        let worker = worker("x").with_padding(-1.0);
        assert!(matches!(
            worker.run(&waveform, &segment(1.0, 3.0)),
            Err(DiarflowError::InvalidPadding { .. })
        ));
    }

    #[test]
    fn test_segment_past_end_yields_empty_text() {
        let waveform = Waveform::silence(2.0, 16000);
        let result = worker("ghost").with_padding(0.0).run(&waveform, &segment(5.0, 6.0)).unwrap();
        assert_eq!(result.text, "");
    }

    #[test]
    fn test_alignment_offsets_are_absolute() {
        let waveform = Waveform::silence(10.0, 16000);
        let worker = worker("one two")
            .with_padding(0.5)
            .with_aligner(Arc::new(MockAligner::new()));

        let result = worker.run(&waveform, &segment(4.0, 6.0)).unwrap();

        assert_eq!(result.words.len(), 2);
        assert!((result.words[0].start - 3.5).abs() < 1e-6);
        assert!(result.words[1].end <= 6.5 + 1e-6);
        assert!(result.words[0].end <= result.words[1].start + 1e-6);
    }

    #[test]
    fn test_short_segment_skips_alignment() {
        let waveform = Waveform::silence(10.0, 16000);
        let worker = worker("hi")
            .with_aligner(Arc::new(MockAligner::new().with_failure()))
            .with_align_min_duration(1.0);

        // A failing aligner is never consulted for a 0.5s segment
        let result = worker.run(&waveform, &segment(2.0, 2.5)).unwrap();
        assert_eq!(result.text, "hi");
        assert!(result.words.is_empty());
    }

    #[test]
    fn test_alignment_failure_fails_segment() {
        let waveform = Waveform::silence(10.0, 16000);
        let worker = worker("hi").with_aligner(Arc::new(MockAligner::new().with_failure()));
        assert!(matches!(
            worker.run(&waveform, &segment(2.0, 5.0)),
            Err(DiarflowError::Alignment { .. })
        ));
    }

    #[test]
    fn test_empty_text_skips_alignment() {
        let waveform = Waveform::silence(10.0, 16000);
        let worker = worker("   ").with_aligner(Arc::new(MockAligner::new().with_failure()));
        let result = worker.run(&waveform, &segment(2.0, 5.0)).unwrap();
        assert!(result.text.is_empty());
    }
}
