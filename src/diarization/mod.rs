//! Diarization adapters and speaker turns.

pub mod diarizer;
pub mod rttm;
pub mod turn;

pub use diarizer::{Diarizer, MockDiarizer, StaticDiarizer};
pub use rttm::{RttmDiarizer, load_turns, parse_rttm};
pub use turn::{Turn, sanitize_turns};
