//! Transcript and plan rendering.
//!
//! Renderers write to any `io::Write`; the CLI passes stdout or a file.

use crate::error::Result;
use crate::merge::MergedSegment;
use crate::pipeline::types::Transcript;
use std::io::Write;

/// Output format for transcripts and merge plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// One line per speaker turn
    #[default]
    Text,
    /// Pretty-printed JSON document
    Json,
    /// SubRip subtitles
    Srt,
}

/// Format seconds as `HH:MM:SS.mmm` (`HH:MM:SS,mmm` when `separator` is ',').
///
/// Negative and non-finite inputs render as zero.
pub fn format_timestamp(secs: f64, separator: char) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let total_ms = (secs * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}{separator}{millis:03}")
}

/// Write `transcript` in `format`.
///
/// Failed segments are not part of the rendered text; JSON output carries
/// them under `failures`.
pub fn render(transcript: &Transcript, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for segment in &transcript.segments {
                writeln!(
                    out,
                    "[{} --> {}] {}: {}",
                    format_timestamp(segment.start, '.'),
                    format_timestamp(segment.end, '.'),
                    segment.speaker_id,
                    segment.text
                )?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, transcript)?;
            writeln!(out)?;
        }
        OutputFormat::Srt => {
            let cues = transcript
                .segments
                .iter()
                .filter(|s| !s.text.is_empty())
                .map(|s| (s.start, s.end, format!("{}: {}", s.speaker_id, s.text)));
            write_srt(cues, out)?;
        }
    }
    Ok(())
}

/// Write a premerge plan in `format`.
pub fn render_plan(
    segments: &[MergedSegment],
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for segment in segments {
                writeln!(
                    out,
                    "{} --> {}  {}  ({:.2}s, {} turn{})",
                    format_timestamp(segment.start, '.'),
                    format_timestamp(segment.end, '.'),
                    segment.speaker_id,
                    segment.duration(),
                    segment.source_turns.len(),
                    if segment.source_turns.len() == 1 { "" } else { "s" }
                )?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, segments)?;
            writeln!(out)?;
        }
        OutputFormat::Srt => {
            let cues = segments
                .iter()
                .map(|s| (s.start, s.end, format!("[{}]", s.speaker_id)));
            write_srt(cues, out)?;
        }
    }
    Ok(())
}

fn write_srt(
    cues: impl Iterator<Item = (f64, f64, String)>,
    out: &mut impl Write,
) -> Result<()> {
    for (i, (start, end, text)) in cues.enumerate() {
        writeln!(out, "{}", i + 1)?;
        writeln!(
            out,
            "{} --> {}",
            format_timestamp(start, ','),
            format_timestamp(end, ',')
        )?;
        writeln!(out, "{}", text)?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diarization::Turn;
    use crate::merge::{FinalSegment, premerge};
    use crate::pipeline::types::FailureSummary;

    fn transcript() -> Transcript {
        Transcript {
            segments: vec![
                FinalSegment {
                    start: 0.0,
                    end: 2.5,
                    speaker_id: "A".to_string(),
                    text: "hello".to_string(),
                    words: vec![],
                },
                FinalSegment {
                    start: 2.5,
                    end: 3.0,
                    speaker_id: "B".to_string(),
                    text: String::new(),
                    words: vec![],
                },
                FinalSegment {
                    start: 3.0,
                    end: 3661.25,
                    speaker_id: "A".to_string(),
                    text: "long one".to_string(),
                    words: vec![],
                },
            ],
            failures: vec![FailureSummary {
                start: 5.0,
                end: 6.0,
                speaker_id: "C".to_string(),
                error: "boom".to_string(),
            }],
            duration_secs: 3700.0,
        }
    }

    fn rendered(format: OutputFormat) -> String {
        let mut buf = Vec::new();
        render(&transcript(), format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0, '.'), "00:00:00.000");
        assert_eq!(format_timestamp(3661.25, '.'), "01:01:01.250");
        assert_eq!(format_timestamp(59.9996, ','), "00:01:00,000");
        assert_eq!(format_timestamp(-3.0, '.'), "00:00:00.000");
        assert_eq!(format_timestamp(f64::NAN, '.'), "00:00:00.000");
    }

    #[test]
    fn test_render_text_lines() {
        let text = rendered(OutputFormat::Text);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[00:00:00.000 --> 00:00:02.500] A: hello");
        assert_eq!(lines[2], "[00:00:03.000 --> 01:01:01.250] A: long one");
    }

    #[test]
    fn test_render_json_includes_failures() {
        let json: serde_json::Value = serde_json::from_str(&rendered(OutputFormat::Json)).unwrap();
        assert_eq!(json["segments"].as_array().unwrap().len(), 3);
        assert_eq!(json["failures"][0]["speaker_id"], "C");
        assert_eq!(json["duration_secs"], 3700.0);
    }

    #[test]
    fn test_render_srt_skips_empty_and_numbers_sequentially() {
        let srt = rendered(OutputFormat::Srt);
        let expected = "1\n00:00:00,000 --> 00:00:02,500\nA: hello\n\n\
                        2\n00:00:03,000 --> 01:01:01,250\nA: long one\n\n";
        assert_eq!(srt, expected);
    }

    #[test]
    fn test_render_plan_text_and_json() {
        let segments = premerge(
            &[
                Turn::new(0.0, 1.0, "A"),
                Turn::new(1.0, 3.0, "A"),
                Turn::new(3.0, 6.0, "B"),
            ],
            1.0,
            30.0,
        );

        let mut buf = Vec::new();
        render_plan(&segments, OutputFormat::Text, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("00:00:00.000 --> 00:00:03.000  A  (3.00s, 2 turns)"));
        assert!(text.contains("B  (3.00s, 1 turn)"));

        let mut buf = Vec::new();
        render_plan(&segments, OutputFormat::Json, &mut buf).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json[0]["source_turns"].as_array().unwrap().len(), 2);
    }
}
