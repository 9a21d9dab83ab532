//! Segment orchestration pipeline.
//!
//! Premerged segments are fanned out to a bounded pool of worker threads
//! connected by crossbeam channels; results are gathered back in submission
//! order before post-merging.

pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod post_processor;
pub mod types;
pub mod worker;

pub use dispatch::{Dispatcher, dispatch};
pub use error::{CollectingReporter, ErrorReporter, LogReporter};
pub use orchestrator::{FailurePolicy, Pipeline, PipelineConfig, plan_segments};
pub use post_processor::{
    AnnotationStripper, HallucinationFilter, SentenceCase, TextProcessor, build_post_processors,
    build_segment_filters,
};
pub use types::{DispatchReport, FailureSummary, SegmentFailure, SegmentResult, Transcript};
pub use worker::SegmentWorker;
