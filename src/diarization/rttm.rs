//! File-backed diarization: RTTM and JSON turn lists.
//!
//! RTTM is the NIST "Rich Transcription Time Marked" format most diarizers
//! can export. Only `SPEAKER` records are used:
//!
//! ```text
//! SPEAKER <file> <chan> <onset> <duration> <NA> <NA> <speaker> <NA> <NA>
//! ```

use crate::audio::Waveform;
use crate::diarization::diarizer::Diarizer;
use crate::diarization::turn::Turn;
use crate::error::{DiarflowError, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

const SPEAKER_RECORD: &str = "SPEAKER";

/// Parse the `SPEAKER` records of an RTTM document into turns.
///
/// Blank lines, `;;`/`#` comments and other record types are skipped.
/// Turns come back in file order; sanitization happens later in the pipeline.
pub fn parse_rttm(contents: &str) -> Result<Vec<Turn>> {
    let mut turns = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields[0] != SPEAKER_RECORD {
            continue;
        }
        if fields.len() < 8 {
            return Err(DiarflowError::RttmParse {
                line: line_no,
                message: format!("expected at least 8 fields, found {}", fields.len()),
            });
        }

        let onset = parse_seconds(fields[3], "onset", line_no)?;
        let duration = parse_seconds(fields[4], "duration", line_no)?;
        turns.push(Turn::new(onset, onset + duration, fields[7]));
    }

    Ok(turns)
}

fn parse_seconds(field: &str, what: &str, line: usize) -> Result<f64> {
    field.parse::<f64>().map_err(|e| DiarflowError::RttmParse {
        line,
        message: format!("invalid {what} '{field}': {e}"),
    })
}

/// Load turns from `.rttm` or `.json` (an array of `{start, end, speaker_id}`).
pub fn load_turns(path: &Path) -> Result<Vec<Turn>> {
    let contents = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let turns: Vec<Turn> = if is_json {
        serde_json::from_str(&contents)?
    } else {
        parse_rttm(&contents)?
    };
    debug!(path = %path.display(), turns = turns.len(), "loaded turns");
    Ok(turns)
}

/// Diarizer backed by turns precomputed by an external tool.
#[derive(Debug, Clone)]
pub struct RttmDiarizer {
    turns: Vec<Turn>,
}

impl RttmDiarizer {
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self {
            turns: load_turns(path)?,
        })
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(Self {
            turns: parse_rttm(contents)?,
        })
    }
}

impl Diarizer for RttmDiarizer {
    fn diarize(&self, _waveform: &Waveform) -> Result<Vec<Turn>> {
        Ok(self.turns.clone())
    }

    fn name(&self) -> &str {
        "rttm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
;; produced by an external diarizer
SPEAKER meeting 1 0.00 2.50 <NA> <NA> spk_0 <NA> <NA>
SPEAKER meeting 1 2.50 0.75 <NA> <NA> spk_1 <NA> <NA>

SPKR-INFO meeting 1 <NA> <NA> <NA> unknown spk_0 <NA> <NA>
SPEAKER meeting 1 3.25 4.00 <NA> <NA> spk_0 <NA> <NA>
";

    #[test]
    fn parses_speaker_records_only() {
        let turns = parse_rttm(SAMPLE).unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0], Turn::new(0.0, 2.5, "spk_0"));
        assert_eq!(turns[1].speaker_id, "spk_1");
        assert!((turns[2].end - 7.25).abs() < 1e-9);
    }

    #[test]
    fn short_record_reports_line_number() {
        let err = parse_rttm("SPEAKER f 1 0.0 1.0\n").unwrap_err();
        match err {
            DiarflowError::RttmParse { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("expected at least 8 fields"));
            }
            other => panic!("Expected RttmParse, got {:?}", other),
        }
    }

    #[test]
    fn bad_number_reports_field() {
        let err = parse_rttm("\nSPEAKER f 1 zero 1.0 <NA> <NA> A <NA> <NA>\n").unwrap_err();
        match err {
            DiarflowError::RttmParse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("onset"));
            }
            other => panic!("Expected RttmParse, got {:?}", other),
        }
    }

    #[test]
    fn load_turns_from_rttm_file() {
        let mut file = tempfile::Builder::new().suffix(".rttm").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        assert_eq!(load_turns(file.path()).unwrap().len(), 3);
    }

    #[test]
    fn load_turns_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"[{"start": 0.0, "end": 1.0, "speaker_id": "A"}]"#)
            .unwrap();
        assert_eq!(load_turns(file.path()).unwrap(), vec![Turn::new(0.0, 1.0, "A")]);
    }

    #[test]
    fn rttm_diarizer_returns_file_turns() {
        let diarizer = RttmDiarizer::parse(SAMPLE).unwrap();
        let turns = diarizer.diarize(&Waveform::silence(8.0, 16000)).unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(diarizer.name(), "rttm");
    }
}
