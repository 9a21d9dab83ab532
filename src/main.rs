use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use diarflow::audio::Waveform;
use diarflow::cli::{Cli, Commands, ConfigAction};
use diarflow::config::Config;
use diarflow::diarization::{RttmDiarizer, load_turns};
use diarflow::output::{OutputFormat, format_timestamp, render, render_plan};
use diarflow::pipeline::{
    FailurePolicy, Pipeline, SegmentWorker, Transcript, build_post_processors,
    build_segment_filters, plan_segments,
};
use diarflow::stt::{ModelHandle, Transcriber};
use owo_colors::OwoColorize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Arguments of `diarflow transcribe`.
struct TranscribeArgs {
    audio: PathBuf,
    turns: PathBuf,
    format: OutputFormat,
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    diarflow::logging::init(cli.verbose, cli.quiet);
    info!(version = %diarflow::version_string(), "diarflow starting");

    match cli.command {
        Commands::Transcribe {
            audio,
            turns,
            model,
            language,
            format,
            output,
            concurrency,
            padding,
            timeout,
            strict,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(model) = model {
                config.stt.model = model.to_string_lossy().to_string();
            }
            if let Some(language) = language {
                config.stt.language = language;
            }
            if let Some(concurrency) = concurrency {
                config.dispatch.concurrency = concurrency;
            }
            if let Some(padding) = padding {
                config.audio.padding_secs = padding;
            }
            if let Some(timeout) = timeout {
                config.dispatch.task_timeout = Some(format_duration(timeout));
            }
            if strict {
                config.dispatch.failure_policy = FailurePolicy::Strict;
            }

            let args = TranscribeArgs {
                audio,
                turns,
                format,
                output,
            };
            run_transcribe(&config, &args, cli.quiet)?;
        }
        Commands::Plan {
            turns,
            format,
            min,
            max,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(min) = min {
                config.merge.min_duration_secs = min;
            }
            if let Some(max) = max {
                config.merge.max_duration_secs = max;
            }
            config.validate()?;

            let turns = load_turns(&turns)
                .with_context(|| format!("Failed to read turns from {}", turns.display()))?;
            let segments = plan_segments(turns, &config.pipeline_config()?)?;

            let mut stdout = io::stdout().lock();
            render_plan(&segments, format, &mut stdout)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigAction::Path => {
                let path = cli.config.unwrap_or_else(Config::default_path);
                println!("{}", path.display());
            }
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "diarflow", &mut io::stdout());
        }
    }

    Ok(())
}

/// Load config from a custom path, or the default path if present.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}

fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

fn run_transcribe(config: &Config, args: &TranscribeArgs, quiet: bool) -> Result<()> {
    config.validate()?;

    let diarizer = RttmDiarizer::from_path(&args.turns)
        .with_context(|| format!("Failed to read turns from {}", args.turns.display()))?;
    let waveform = Waveform::from_path_at(&args.audio, config.audio.sample_rate)?;
    info!(
        audio = %args.audio.display(),
        duration_secs = waveform.duration_secs(),
        "audio loaded"
    );

    let models: ModelHandle<dyn Transcriber> = ModelHandle::new("stt");
    let transcriber = load_transcriber(config, &models)?;
    if config.align.enabled {
        warn!("no forced-alignment backend is available; word timings are disabled");
    }
    let worker = SegmentWorker::new(transcriber)
        .with_padding(config.audio.padding_secs)
        .with_align_min_duration(config.align.min_duration_secs);

    let pipeline = Pipeline::new(config.pipeline_config()?, Arc::new(diarizer), Arc::new(worker))
        .with_segment_filters(build_segment_filters(&config.text))
        .with_post_processors(build_post_processors(&config.text));

    let transcript = pipeline.run(Arc::new(waveform))?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            render(&transcript, args.format, &mut writer)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            render(&transcript, args.format, &mut stdout)?;
        }
    }

    if !quiet {
        print_failure_summary(&transcript);
    }
    Ok(())
}

/// List dropped segments on stderr.
fn print_failure_summary(transcript: &Transcript) {
    if transcript.failures.is_empty() {
        return;
    }
    eprintln!(
        "{} {} segment(s) could not be transcribed:",
        "warning:".yellow().bold(),
        transcript.failures.len()
    );
    for failure in &transcript.failures {
        eprintln!(
            "  {} {} --> {} {}: {}",
            "-".dimmed(),
            format_timestamp(failure.start, '.'),
            format_timestamp(failure.end, '.'),
            failure.speaker_id.bold(),
            failure.error
        );
    }
}

/// Load the configured speech-to-text model into `models`.
#[cfg(feature = "whisper")]
fn load_transcriber(
    config: &Config,
    models: &ModelHandle<dyn Transcriber>,
) -> Result<Arc<dyn Transcriber>> {
    use diarflow::stt::Serialized;
    use diarflow::stt::whisper::{WhisperConfig, WhisperTranscriber};

    let transcriber = models.get_or_load(|| {
        let whisper = WhisperTranscriber::new(WhisperConfig {
            model_path: PathBuf::from(&config.stt.model),
            language: config.stt.language.clone(),
            threads: config.stt.threads,
        })?;
        let shared: Arc<dyn Transcriber> = if config.dispatch.serialize_models {
            Arc::new(Serialized::transcriber(whisper))
        } else {
            Arc::new(whisper)
        };
        Ok(shared)
    })?;
    Ok(transcriber)
}

#[cfg(not(feature = "whisper"))]
fn load_transcriber(
    _config: &Config,
    _models: &ModelHandle<dyn Transcriber>,
) -> Result<Arc<dyn Transcriber>> {
    anyhow::bail!(
        "no speech-to-text backend compiled in; rebuild with `--features whisper` \
         (use `diarflow plan` to inspect segmentation without a model)"
    )
}
