//! Default configuration constants for diarflow.
//!
//! Shared by the config layer, the CLI and the pipeline builders so the
//! same numbers are used everywhere.

/// Sample rate every waveform is normalized to, in Hz.
///
/// 16kHz is what the speech models behind the adapters expect.
pub const SAMPLE_RATE: u32 = 16000;

/// Minimum merged segment duration in seconds.
///
/// Segments shorter than this starve the ASR model of acoustic context and
/// are force-merged into the following turn.
pub const MIN_SEGMENT_SECS: f64 = 1.0;

/// Soft ceiling on merged segment duration in seconds.
///
/// Same-speaker turns stop accumulating once the combined span would exceed
/// this. A single longer turn is never split.
pub const MAX_SEGMENT_SECS: f64 = 30.0;

/// Context padding added on both sides of a segment before transcription.
pub const PADDING_SECS: f64 = 0.25;

/// Number of segment workers running concurrently.
pub const CONCURRENCY: usize = 4;

/// Segments shorter than this skip forced alignment and carry no word timings.
pub const ALIGN_MIN_SECS: f64 = 0.5;

/// Duration given to zero-length or inverted turns during sanitization.
pub const TURN_EPSILON_SECS: f64 = 0.01;

/// Default Whisper model path used when no `--model` is given.
pub const DEFAULT_MODEL: &str = "models/ggml-base.bin";

/// Default language code for transcription.
///
/// "auto" lets the ASR model detect the spoken language.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Non-speech phrases the ASR model is known to emit on silence.
pub const HALLUCINATION_FILTERS: &[&str] = &["thank you.", "thanks for watching!", "you"];
