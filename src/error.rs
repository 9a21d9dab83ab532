//! Error types for diarflow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiarflowError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio errors
    #[error("Audio decoding failed: {message}")]
    AudioDecode { message: String },

    #[error("Invalid extraction padding {padding}: must be finite and non-negative")]
    InvalidPadding { padding: f64 },

    // Diarization errors
    #[error("Diarization failed: {message}")]
    Diarization { message: String },

    #[error("Malformed RTTM at line {line}: {message}")]
    RttmParse { line: usize, message: String },

    #[error("Diarizer produced no speaker turns")]
    NoTurns,

    // Transcription and alignment errors
    #[error("Transcription model not found at {path}")]
    TranscriptionModelNotFound { path: String },

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    #[error("Alignment error: {message}")]
    Alignment { message: String },

    #[error("Model '{model}' failed to load: {message}")]
    ModelLoad { model: String, message: String },

    // Dispatch errors
    #[error("Segment task exceeded timeout of {timeout_ms}ms")]
    TaskTimeout { timeout_ms: u128 },

    #[error("Segment worker panicked: {message}")]
    WorkerPanicked { message: String },

    #[error("Dispatch error: {message}")]
    Dispatch { message: String },

    // Pipeline outcome errors
    #[error("{failed} of {total} segments failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("All {total} segments failed; first error: {first}")]
    AllSegmentsFailed { total: usize, first: String },

    // Serialization and I/O
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DiarflowError>;
