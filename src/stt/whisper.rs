//! Whisper-based speech-to-text transcription.
//!
//! This module provides a Whisper implementation of the Transcriber trait using whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be installed:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::defaults;
use crate::error::{DiarflowError, Result};
use crate::stt::transcriber::Transcriber;
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for Whisper transcriber.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Language code (e.g., "en", "sl", "de") or "auto"
    pub language: String,
    /// Number of threads per inference call (None = whisper.cpp default)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::DEFAULT_MODEL),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper-based transcriber implementation.
///
/// The context is loaded once and shared. The lock is held only while a
/// decoder state is created; inference itself runs on the per-call state, so
/// concurrent segment workers decode in parallel.
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

impl WhisperTranscriber {
    /// Load a Whisper model.
    ///
    /// # Errors
    /// Returns `DiarflowError::TranscriptionModelNotFound` if the model file doesn't exist
    /// Returns `DiarflowError::ModelLoad` if model loading fails
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Route whisper.cpp logging away from stderr (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(DiarflowError::TranscriptionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let model_path = config.model_path.to_str().ok_or_else(|| DiarflowError::ModelLoad {
            model: model_name.clone(),
            message: "Invalid UTF-8 in model path".to_string(),
        })?;

        let context = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| DiarflowError::ModelLoad {
                model: model_name.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

/// whisper.cpp takes a C int; saturate instead of wrapping.
fn thread_count(threads: usize) -> i32 {
    i32::try_from(threads).unwrap_or(i32::MAX)
}

/// Convert i16 audio samples to f32 normalized to [-1.0, 1.0].
fn convert_audio(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        let audio_f32 = convert_audio(audio);

        let mut state = {
            let context = self
                .context
                .lock()
                .map_err(|e| DiarflowError::Transcription {
                    message: format!("Failed to acquire context lock: {}", e),
                })?;
            context
                .create_state()
                .map_err(|e| DiarflowError::Transcription {
                    message: format!("Failed to create Whisper state: {}", e),
                })?
        };

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if self.config.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.language));
        }

        if let Some(threads) = self.config.threads {
            params.set_n_threads(thread_count(threads));
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio_f32)
            .map_err(|e| DiarflowError::Transcription {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut transcription = String::new();
        for segment in state.as_iter() {
            transcription.push_str(&segment.to_string());
        }

        Ok(transcription.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }
}
