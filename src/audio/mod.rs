//! Audio input: WAV decoding and padded segment extraction.

pub mod wav;
pub mod waveform;

pub use wav::{read_wav, read_wav_at};
pub use waveform::{Waveform, Window, extract, padded_window};
