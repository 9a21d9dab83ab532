//! WAV decoding into a normalized [`Waveform`].

use crate::audio::waveform::Waveform;
use crate::defaults::SAMPLE_RATE;
use crate::error::{DiarflowError, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Decode WAV data from any reader.
/// Supports arbitrary sample rates and channels, resampling to 16kHz mono.
pub fn read_wav<R: Read>(reader: R) -> Result<Waveform> {
    read_wav_at(reader, SAMPLE_RATE)
}

/// Decode WAV data and resample to `target_rate` mono.
pub fn read_wav_at<R: Read>(reader: R, target_rate: u32) -> Result<Waveform> {
    if target_rate == 0 {
        return Err(DiarflowError::AudioDecode {
            message: "target sample rate must be positive".to_string(),
        });
    }
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| DiarflowError::AudioDecode {
        message: format!("Failed to parse WAV file: {}", e),
    })?;

    let spec = wav_reader.spec();
    let source_rate = spec.sample_rate;
    let source_channels = spec.channels;

    let raw_samples: Vec<i16> = wav_reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DiarflowError::AudioDecode {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    let mono_samples = downmix(raw_samples, source_channels);

    let samples = if source_rate != target_rate {
        resample(&mono_samples, source_rate, target_rate)
    } else {
        mono_samples
    };

    Ok(Waveform::new(samples, target_rate))
}

impl Waveform {
    /// Load and normalize a WAV file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_path_at(path, SAMPLE_RATE)
    }

    /// Load a WAV file from disk, resampling to `sample_rate`.
    pub fn from_path_at(path: &Path, sample_rate: u32) -> Result<Self> {
        let file = File::open(path).map_err(|e| DiarflowError::AudioDecode {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        read_wav_at(BufReader::new(file), sample_rate)
    }
}

/// Average interleaved channels down to mono.
fn downmix(samples: Vec<i16>, channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}
