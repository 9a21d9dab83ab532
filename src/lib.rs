//! diarflow - diarization-first speech transcription
//!
//! Splits a recording into speaker turns, merges them into segments sized
//! for an ASR model, transcribes segments in parallel and stitches the
//! results back into a speaker-attributed transcript.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod diarization;
pub mod error;
pub mod logging;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod stt;

// Core traits (diarize → transcribe → align)
pub use diarization::Diarizer;
pub use stt::{Aligner, Transcriber};

// Data model
pub use audio::Waveform;
pub use diarization::Turn;
pub use merge::{FinalSegment, MergedSegment, ShortSegmentPolicy, postmerge, premerge};
pub use stt::WordTiming;

// Pipeline
pub use pipeline::dispatch::{Dispatcher, dispatch};
pub use pipeline::orchestrator::{FailurePolicy, Pipeline, PipelineConfig};
pub use pipeline::types::{DispatchReport, SegmentFailure, SegmentResult, Transcript};
pub use pipeline::worker::SegmentWorker;

// Error handling
pub use error::{DiarflowError, Result};

// Config
pub use config::Config;

pub use pipeline::error::ErrorReporter;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
