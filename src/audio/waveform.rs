//! In-memory mono waveform and padded segment extraction.

use crate::error::{DiarflowError, Result};

/// Mono 16-bit PCM audio with its sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A silent waveform of the given length, mostly useful for tests.
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let len = (duration_secs.max(0.0) * sample_rate as f64).round() as usize;
        Self::new(vec![0; len], sample_rate)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Convert a time in seconds to a sample index, clamped to `[0, len]`.
    pub fn seconds_to_index(&self, secs: f64) -> usize {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        let idx = (secs * self.sample_rate as f64).round() as usize;
        idx.min(self.samples.len())
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Time window actually read by [`extract`], after padding and clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Compute `[start - padding, end + padding]` clamped to `[0, duration]`.
///
/// A request entirely past the end collapses to an empty window at the end
/// of the audio.
pub fn padded_window(duration: f64, start: f64, end: f64, padding: f64) -> Result<Window> {
    if !padding.is_finite() || padding < 0.0 {
        return Err(DiarflowError::InvalidPadding { padding });
    }
    let duration = duration.max(0.0);
    let lo = (start - padding).clamp(0.0, duration);
    let hi = (end + padding).clamp(0.0, duration);
    Ok(Window {
        start: lo,
        end: hi.max(lo),
    })
}

/// Return the padded sub-waveform covering `[start, end]`.
///
/// The window is clamped to the source so reads never go out of bounds. The
/// result keeps the source sample rate and its length matches the clamped
/// window to within one sample.
pub fn extract(waveform: &Waveform, start: f64, end: f64, padding: f64) -> Result<Waveform> {
    let window = padded_window(waveform.duration_secs(), start, end, padding)?;
    Ok(slice_window(waveform, window))
}

/// Copy the samples covered by an already clamped window.
pub fn slice_window(waveform: &Waveform, window: Window) -> Waveform {
    let from = waveform.seconds_to_index(window.start);
    let to = waveform.seconds_to_index(window.end).max(from);
    Waveform::new(waveform.samples[from..to].to_vec(), waveform.sample_rate)
}
