//! End-to-end pipeline: diarize, merge, dispatch, merge again, clean up text.

use crate::audio::Waveform;
use crate::defaults;
use crate::diarization::{Diarizer, Turn, sanitize_turns};
use crate::error::{DiarflowError, Result};
use crate::merge::{MergedSegment, ShortSegmentPolicy, postmerge, premerge_with_policy};
use crate::pipeline::dispatch::Dispatcher;
use crate::pipeline::error::{ErrorReporter, LogReporter};
use crate::pipeline::post_processor::{TextProcessor, apply_all};
use crate::pipeline::types::{SegmentFailure, Transcript};
use crate::pipeline::worker::SegmentWorker;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// What to do when some, but not all, segments fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Return the partial transcript and list the dropped segments.
    #[default]
    Tolerate,
    /// Fail the whole run with [`DiarflowError::PartialFailure`].
    Strict,
}

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Segments shorter than this are merged into a neighbour
    pub min_duration_secs: f64,
    /// Same-speaker merging stops at this length
    pub max_duration_secs: f64,
    pub short_segment_policy: ShortSegmentPolicy,
    /// Maximum segments in flight
    pub concurrency: usize,
    /// Per-segment deadline (None = unbounded)
    pub task_timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: defaults::MIN_SEGMENT_SECS,
            max_duration_secs: defaults::MAX_SEGMENT_SECS,
            short_segment_policy: ShortSegmentPolicy::default(),
            concurrency: defaults::CONCURRENCY,
            task_timeout: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Sanitize `turns` and premerge them under `config`.
///
/// # Errors
/// Returns `DiarflowError::NoTurns` if no usable turn remains.
pub fn plan_segments(turns: Vec<Turn>, config: &PipelineConfig) -> Result<Vec<MergedSegment>> {
    let turns = sanitize_turns(turns);
    if turns.is_empty() {
        return Err(DiarflowError::NoTurns);
    }
    Ok(premerge_with_policy(
        &turns,
        config.min_duration_secs,
        config.max_duration_secs,
        config.short_segment_policy,
    ))
}

/// Diarization-first transcription pipeline.
///
/// Diarizer → sanitize → premerge → dispatch(worker) → postmerge → text processors.
pub struct Pipeline {
    config: PipelineConfig,
    diarizer: Arc<dyn Diarizer>,
    worker: Arc<SegmentWorker>,
    segment_filters: Vec<Box<dyn TextProcessor>>,
    post_processors: Vec<Box<dyn TextProcessor>>,
    error_reporter: Arc<dyn ErrorReporter>,
}

impl Pipeline {
    /// Creates a new pipeline with the default error reporter and no text
    /// post-processing.
    pub fn new(
        config: PipelineConfig,
        diarizer: Arc<dyn Diarizer>,
        worker: Arc<SegmentWorker>,
    ) -> Self {
        Self {
            config,
            diarizer,
            worker,
            segment_filters: Vec::new(),
            post_processors: Vec::new(),
            error_reporter: Arc::new(LogReporter),
        }
    }

    /// Cleanup applied to each segment's text before same-speaker
    /// segments are coalesced.
    pub fn with_segment_filters(mut self, filters: Vec<Box<dyn TextProcessor>>) -> Self {
        self.segment_filters = filters;
        self
    }

    /// Processing applied to each coalesced speaker turn.
    pub fn with_post_processors(mut self, processors: Vec<Box<dyn TextProcessor>>) -> Self {
        self.post_processors = processors;
        self
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Sanitize and premerge `turns` without touching any audio.
    ///
    /// # Errors
    /// Returns `DiarflowError::NoTurns` if no usable turn remains.
    pub fn plan(&self, turns: Vec<Turn>) -> Result<Vec<MergedSegment>> {
        plan_segments(turns, &self.config)
    }

    /// Run the full pipeline over `waveform`.
    ///
    /// Individual segment failures are reported and, under
    /// [`FailurePolicy::Tolerate`], listed in [`Transcript::failures`].
    ///
    /// # Errors
    /// - diarization errors propagate unchanged
    /// - `NoTurns` if diarization yields nothing usable
    /// - `AllSegmentsFailed` if no segment could be transcribed
    /// - `PartialFailure` under [`FailurePolicy::Strict`]
    pub fn run(&self, waveform: Arc<Waveform>) -> Result<Transcript> {
        let started = Instant::now();

        let turns = self.diarizer.diarize(&waveform)?;
        info!(diarizer = self.diarizer.name(), turns = turns.len(), "diarization complete");

        let segments = self.plan(turns)?;
        let total = segments.len();
        info!(
            segments = total,
            min_secs = self.config.min_duration_secs,
            max_secs = self.config.max_duration_secs,
            "premerge complete"
        );

        let worker = Arc::clone(&self.worker);
        let audio = Arc::clone(&waveform);
        let report = self
            .dispatcher()
            .run(segments, move |segment| worker.run(&audio, segment))?;

        for failure in &report.failed {
            self.error_reporter.report("dispatch", failure);
        }

        if report.succeeded.is_empty() {
            let first = report
                .failed
                .first()
                .map(|f| f.error.to_string())
                .unwrap_or_default();
            return Err(DiarflowError::AllSegmentsFailed { total, first });
        }

        let failed = report.failed.len();
        if failed > 0 {
            if self.config.failure_policy == FailurePolicy::Strict {
                return Err(DiarflowError::PartialFailure { failed, total });
            }
            warn!(failed, total, "continuing with partial transcript");
        }

        let failures = report.failed.iter().map(SegmentFailure::summary).collect();
        let mut results = report.succeeded;
        if !self.segment_filters.is_empty() {
            for result in &mut results {
                result.text = apply_all(&self.segment_filters, &result.text);
            }
        }
        let mut segments = postmerge(results);
        if !self.post_processors.is_empty() {
            for segment in &mut segments {
                segment.text = apply_all(&self.post_processors, &segment.text);
            }
        }

        info!(
            turns = segments.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline complete"
        );

        Ok(Transcript {
            segments,
            failures,
            duration_secs: waveform.duration_secs(),
        })
    }

    fn dispatcher(&self) -> Dispatcher {
        let dispatcher = Dispatcher::new(self.config.concurrency);
        match self.config.task_timeout {
            Some(timeout) => dispatcher.with_timeout(timeout),
            None => dispatcher,
        }
    }
}
