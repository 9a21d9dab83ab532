use crate::defaults;
use crate::error::{DiarflowError, Result};
use crate::merge::ShortSegmentPolicy;
use crate::pipeline::orchestrator::{FailurePolicy, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub merge: MergeConfig,
    pub dispatch: DispatchConfig,
    pub align: AlignConfig,
    pub text: TextConfig,
    pub stt: SttConfig,
}

/// Audio decoding and segment extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate every input is resampled to before diarization
    pub sample_rate: u32,
    /// Context added on both sides of each segment, in seconds
    pub padding_secs: f64,
}

/// Pre-merge policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeConfig {
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    pub short_segment_policy: ShortSegmentPolicy,
}

/// Parallel segment dispatch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    pub concurrency: usize,
    /// Per-segment deadline as a humantime string, e.g. "30s" or "2m"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_timeout: Option<String>,
    pub failure_policy: FailurePolicy,
    /// Guard each model with a mutex so only one inference runs at a time
    pub serialize_models: bool,
}

/// Forced word alignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignConfig {
    pub enabled: bool,
    /// Segments shorter than this are not aligned
    pub min_duration_secs: f64,
}

/// Text clean-up applied to final segments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    pub strip_annotations: bool,
    pub sentence_case: bool,
    /// Whole-segment phrases to blank (case-insensitive)
    pub hallucination_filters: Vec<String>,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            padding_secs: defaults::PADDING_SECS,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: defaults::MIN_SEGMENT_SECS,
            max_duration_secs: defaults::MAX_SEGMENT_SECS,
            short_segment_policy: ShortSegmentPolicy::default(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::CONCURRENCY,
            task_timeout: None,
            failure_policy: FailurePolicy::default(),
            serialize_models: false,
        }
    }
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_duration_secs: defaults::ALIGN_MIN_SECS,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            strip_annotations: true,
            sentence_case: false,
            hallucination_filters: defaults::HALLUCINATION_FILTERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - DIARFLOW_MODEL → stt.model
    /// - DIARFLOW_LANGUAGE → stt.language
    /// - DIARFLOW_CONCURRENCY → dispatch.concurrency
    /// - DIARFLOW_PADDING → audio.padding_secs
    ///
    /// Empty values are ignored; unparsable numbers are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("DIARFLOW_MODEL")
            && !model.is_empty()
        {
            self.stt.model = model;
        }

        if let Ok(language) = std::env::var("DIARFLOW_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(raw) = std::env::var("DIARFLOW_CONCURRENCY")
            && !raw.is_empty()
        {
            match raw.parse::<usize>() {
                Ok(concurrency) => self.dispatch.concurrency = concurrency,
                Err(e) => warn!(value = %raw, error = %e, "ignoring DIARFLOW_CONCURRENCY"),
            }
        }

        if let Ok(raw) = std::env::var("DIARFLOW_PADDING")
            && !raw.is_empty()
        {
            match raw.parse::<f64>() {
                Ok(padding) => self.audio.padding_secs = padding,
                Err(e) => warn!(value = %raw, error = %e, "ignoring DIARFLOW_PADDING"),
            }
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/diarflow/config.toml on Linux, or a path relative to
    /// the working directory when no config directory is known.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diarflow")
            .join("config.toml")
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must be positive"));
        }
        if !self.audio.padding_secs.is_finite() || self.audio.padding_secs < 0.0 {
            return Err(invalid("audio.padding_secs", "must be a non-negative number"));
        }
        if self.merge.min_duration_secs.is_nan() || self.merge.min_duration_secs < 0.0 {
            return Err(invalid("merge.min_duration_secs", "must be non-negative"));
        }
        if self.merge.max_duration_secs.is_nan() || self.merge.max_duration_secs <= 0.0 {
            return Err(invalid("merge.max_duration_secs", "must be positive"));
        }
        if self.merge.min_duration_secs > self.merge.max_duration_secs {
            return Err(invalid(
                "merge.min_duration_secs",
                &format!(
                    "{} exceeds merge.max_duration_secs {}",
                    self.merge.min_duration_secs, self.merge.max_duration_secs
                ),
            ));
        }
        if self.dispatch.concurrency == 0 {
            return Err(invalid("dispatch.concurrency", "must be at least 1"));
        }
        if self.align.min_duration_secs.is_nan() || self.align.min_duration_secs < 0.0 {
            return Err(invalid("align.min_duration_secs", "must be non-negative"));
        }
        if let Some(threads) = self.stt.threads
            && (threads == 0 || i32::try_from(threads).is_err())
        {
            return Err(invalid(
                "stt.threads",
                &format!("must be between 1 and {}", i32::MAX),
            ));
        }
        self.task_timeout()?;
        Ok(())
    }

    /// Parsed `dispatch.task_timeout`.
    pub fn task_timeout(&self) -> Result<Option<Duration>> {
        match self.dispatch.task_timeout.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => humantime::parse_duration(raw)
                .map(Some)
                .map_err(|e| invalid("dispatch.task_timeout", &e.to_string())),
        }
    }

    /// Pipeline settings derived from the `[merge]` and `[dispatch]` sections.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            min_duration_secs: self.merge.min_duration_secs,
            max_duration_secs: self.merge.max_duration_secs,
            short_segment_policy: self.merge.short_segment_policy,
            concurrency: self.dispatch.concurrency,
            task_timeout: self.task_timeout()?,
            failure_policy: self.dispatch.failure_policy,
        })
    }
}

fn invalid(key: &str, message: &str) -> DiarflowError {
    DiarflowError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_diarflow_env() {
        remove_env("DIARFLOW_MODEL");
        remove_env("DIARFLOW_LANGUAGE");
        remove_env("DIARFLOW_CONCURRENCY");
        remove_env("DIARFLOW_PADDING");
    }

    fn write_config(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.padding_secs, defaults::PADDING_SECS);
        assert_eq!(config.merge.min_duration_secs, defaults::MIN_SEGMENT_SECS);
        assert_eq!(config.merge.max_duration_secs, defaults::MAX_SEGMENT_SECS);
        assert_eq!(config.merge.short_segment_policy, ShortSegmentPolicy::ForceMerge);
        assert_eq!(config.dispatch.concurrency, defaults::CONCURRENCY);
        assert_eq!(config.dispatch.task_timeout, None);
        assert_eq!(config.dispatch.failure_policy, FailurePolicy::Tolerate);
        assert!(!config.dispatch.serialize_models);
        assert!(!config.align.enabled);
        assert!(config.text.strip_annotations);
        assert!(!config.text.sentence_case);
        assert!(!config.text.hallucination_filters.is_empty());
        assert_eq!(config.stt.model, defaults::DEFAULT_MODEL);
        assert_eq!(config.stt.language, "auto");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_file = write_config(
            r#"
            [audio]
            sample_rate = 8000
            padding_secs = 0.5

            [merge]
            min_duration_secs = 2.0
            max_duration_secs = 20.0
            short_segment_policy = "preserve-speaker"

            [dispatch]
            concurrency = 8
            task_timeout = "90s"
            failure_policy = "strict"
            serialize_models = true

            [align]
            enabled = true
            min_duration_secs = 1.5

            [text]
            strip_annotations = false
            sentence_case = true
            hallucination_filters = ["bye."]

            [stt]
            model = "/models/ggml-large-v3.bin"
            language = "de"
            threads = 2
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.audio.sample_rate, 8000);
        assert_eq!(config.audio.padding_secs, 0.5);
        assert_eq!(config.merge.short_segment_policy, ShortSegmentPolicy::PreserveSpeaker);
        assert_eq!(config.dispatch.concurrency, 8);
        assert_eq!(config.dispatch.failure_policy, FailurePolicy::Strict);
        assert!(config.dispatch.serialize_models);
        assert_eq!(config.task_timeout().unwrap(), Some(Duration::from_secs(90)));
        assert!(config.align.enabled);
        assert_eq!(config.align.min_duration_secs, 1.5);
        assert!(config.text.sentence_case);
        assert_eq!(config.text.hallucination_filters, vec!["bye.".to_string()]);
        assert_eq!(config.stt.language, "de");
        assert_eq!(config.stt.threads, Some(2));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let temp_file = write_config(
            r#"
            [dispatch]
            concurrency = 2
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.dispatch.concurrency, 2);
        assert_eq!(config.merge, MergeConfig::default());
        assert_eq!(config.stt, SttConfig::default());
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_env_override_model() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_diarflow_env();

        set_env("DIARFLOW_MODEL", "/tmp/tiny.bin");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.stt.model, "/tmp/tiny.bin");
        assert_eq!(config.stt.language, "auto"); // Not overridden

        clear_diarflow_env();
    }

    #[test]
    fn test_env_override_numbers() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_diarflow_env();

        set_env("DIARFLOW_CONCURRENCY", "12");
        set_env("DIARFLOW_PADDING", "0.1");
        set_env("DIARFLOW_LANGUAGE", "fr");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.dispatch.concurrency, 12);
        assert_eq!(config.audio.padding_secs, 0.1);
        assert_eq!(config.stt.language, "fr");

        clear_diarflow_env();
    }

    #[test]
    fn test_env_override_invalid_number_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_diarflow_env();

        set_env("DIARFLOW_CONCURRENCY", "many");
        set_env("DIARFLOW_PADDING", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.dispatch.concurrency, defaults::CONCURRENCY);
        assert_eq!(config.audio.padding_secs, defaults::PADDING_SECS);

        clear_diarflow_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_diarflow_env();

        set_env("DIARFLOW_MODEL", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.stt.model, defaults::DEFAULT_MODEL);

        clear_diarflow_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let temp_file = write_config(
            r#"
            [merge
            min_duration_secs = "broken
        "#,
        );

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let temp_file = write_config(
            r#"
            [merge]
            short_segment_policy = "sometimes"
        "#,
        );

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_default_path_ends_with_app_dir() {
        let path = Config::default_path();
        assert!(path.ends_with("diarflow/config.toml"));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_errors_on_invalid_toml() {
        let temp_file = write_config("[audio\npadding_secs = ");

        let err = Config::load_or_default(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.audio.padding_secs = -0.5;
        assert!(matches!(
            config.validate(),
            Err(DiarflowError::ConfigInvalidValue { ref key, .. }) if key == "audio.padding_secs"
        ));

        let mut config = Config::default();
        config.merge.min_duration_secs = 40.0;
        config.merge.max_duration_secs = 30.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dispatch.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dispatch.task_timeout = Some("soon".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_thread_count_range() {
        let mut config = Config::default();
        config.stt.threads = Some(8);
        assert!(config.validate().is_ok());

        for threads in [0, i32::MAX as usize + 1] {
            config.stt.threads = Some(threads);
            assert!(
                matches!(
                    config.validate(),
                    Err(DiarflowError::ConfigInvalidValue { ref key, .. }) if key == "stt.threads"
                ),
                "threads={threads} should be rejected"
            );
        }
    }

    #[test]
    fn test_pipeline_config_mirrors_sections() {
        let mut config = Config::default();
        config.merge.min_duration_secs = 2.5;
        config.dispatch.concurrency = 3;
        config.dispatch.task_timeout = Some("1m".to_string());

        let pipeline = config.pipeline_config().unwrap();

        assert_eq!(pipeline.min_duration_secs, 2.5);
        assert_eq!(pipeline.concurrency, 3);
        assert_eq!(pipeline.task_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_default_config_serializes_to_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
