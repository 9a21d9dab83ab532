//! Command-line interface for diarflow
//!
//! Provides argument parsing using clap derive macros.

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Diarization-first speech transcription
#[derive(Parser, Debug)]
#[command(
    name = "diarflow",
    version,
    about = "Diarization-first speech transcription"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: progress, -vv: per-segment diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a duration such as `30s`, `2m` or a bare number of seconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a recording using speaker turns from a diarizer
    Transcribe {
        /// 16-bit PCM WAV file (any rate and channel count)
        #[arg(long, value_name = "FILE")]
        audio: PathBuf,

        /// Speaker turns as RTTM or JSON
        #[arg(long, value_name = "FILE")]
        turns: PathBuf,

        /// Path to a ggml Whisper model (overrides stt.model)
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,

        /// Language code or "auto" (overrides stt.language)
        #[arg(long, value_name = "LANG")]
        language: Option<String>,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the transcript to a file instead of stdout
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,

        /// Segments transcribed in parallel (overrides dispatch.concurrency)
        #[arg(long, short = 'j', value_name = "N")]
        concurrency: Option<usize>,

        /// Seconds of context around each segment (overrides audio.padding_secs)
        #[arg(long, value_name = "SECS")]
        padding: Option<f64>,

        /// Per-segment timeout, e.g. 30s or 2m (overrides dispatch.task_timeout)
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Fail if any segment fails instead of returning a partial transcript
        #[arg(long)]
        strict: bool,
    },

    /// Show how speaker turns would be merged, without transcribing
    Plan {
        /// Speaker turns as RTTM or JSON
        #[arg(long, value_name = "FILE")]
        turns: PathBuf,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Minimum segment duration in seconds (overrides merge.min_duration_secs)
        #[arg(long, value_name = "SECS")]
        min: Option<f64>,

        /// Maximum segment duration in seconds (overrides merge.max_duration_secs)
        #[arg(long, value_name = "SECS")]
        max: Option<f64>,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}
