use crate::error::{DiarflowError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (real ASR model vs mock).
/// Implementations are shared read-only across segment workers.
pub trait Transcriber: Send + Sync {
    /// Transcribe audio samples to text.
    ///
    /// # Arguments
    /// * `audio` - Audio samples as 16-bit PCM at 16kHz mono
    fn transcribe(&self, audio: &[i16]) -> Result<String>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across workers.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        (**self).transcribe(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock transcriber for testing
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    delay: Option<Duration>,
    probe: Option<ConcurrencyProbe>,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            delay: None,
            probe: None,
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Sleep for `delay` inside every call, simulating inference time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Record concurrent calls into `probe`.
    pub fn with_probe(mut self, probe: ConcurrencyProbe) -> Self {
        self.probe = Some(probe);
        self
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio: &[i16]) -> Result<String> {
        let _guard = self.probe.as_ref().map(ConcurrencyProbe::enter);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.should_fail {
            Err(DiarflowError::Transcription {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}

/// Tracks how many calls are in flight at once and the peak observed.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a call as started; the returned guard marks it finished on drop.
    pub fn enter(&self) -> ProbeGuard {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        ProbeGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub struct ProbeGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
