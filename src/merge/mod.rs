//! Merge policies applied before and after transcription.

pub mod postmerge;
pub mod premerge;

pub use postmerge::{FinalSegment, postmerge};
pub use premerge::{MergedSegment, ShortSegmentPolicy, premerge, premerge_with_policy};
