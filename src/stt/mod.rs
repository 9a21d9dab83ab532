//! Speech-to-text and forced-alignment adapters.

pub mod aligner;
pub mod shared;
pub mod transcriber;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use aligner::{Aligner, MockAligner, NoopAligner, WordTiming};
pub use shared::{ModelHandle, Serialized};
pub use transcriber::{ConcurrencyProbe, MockTranscriber, Transcriber};
