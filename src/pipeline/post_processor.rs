//! Text post-processing.
//!
//! Cleanup filters run on each segment's raw ASR text before speaker turns
//! are coalesced, so a hallucinated phrase is caught before it is joined to
//! its neighbours. Formatting runs on each final turn. Processors only
//! rewrite text; segment timing and word lists are left as they are.

use crate::config::TextConfig;

/// Trait for text post-processing.
pub trait TextProcessor: Send + Sync {
    /// Transform one segment's text. Returns the processed string.
    fn process(&self, text: &str) -> String;

    /// Name for logging/diagnostics.
    fn name(&self) -> &'static str;
}

/// Apply `processors` in order.
pub fn apply_all(processors: &[Box<dyn TextProcessor>], text: &str) -> String {
    processors
        .iter()
        .fold(text.to_string(), |acc, processor| processor.process(&acc))
}

/// Build the per-segment cleanup chain: annotation stripping, then
/// hallucination filtering.
pub fn build_segment_filters(config: &TextConfig) -> Vec<Box<dyn TextProcessor>> {
    let mut filters: Vec<Box<dyn TextProcessor>> = Vec::new();

    if config.strip_annotations {
        filters.push(Box::new(AnnotationStripper));
    }
    if !config.hallucination_filters.is_empty() {
        filters.push(Box::new(HallucinationFilter::new(
            &config.hallucination_filters,
        )));
    }

    filters
}

/// Build the chain applied to each coalesced speaker turn.
pub fn build_post_processors(config: &TextConfig) -> Vec<Box<dyn TextProcessor>> {
    let mut processors: Vec<Box<dyn TextProcessor>> = Vec::new();

    if config.sentence_case {
        processors.push(Box::new(SentenceCase));
    }

    processors
}

/// Removes bracketed non-speech markers such as `[MUSIC]`, `(laughs)` and
/// `*cough*`, then collapses runs of spaces.
///
/// An opener without a matching closer is kept verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationStripper;

impl TextProcessor for AnnotationStripper {
    fn process(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut chars = text.chars();

        while let Some(ch) = chars.next() {
            let close = match ch {
                '[' => ']',
                '(' => ')',
                '*' => '*',
                _ => {
                    result.push(ch);
                    continue;
                }
            };
            let mut buf = String::new();
            let mut found_close = false;
            for inner in chars.by_ref() {
                if inner == close {
                    found_close = true;
                    break;
                }
                buf.push(inner);
            }
            if !found_close {
                result.push(ch);
                result.push_str(&buf);
            }
        }

        result.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn name(&self) -> &'static str {
        "annotation-stripper"
    }
}

/// Blanks a segment whose whole text is a known hallucination phrase.
///
/// Matching is exact after trimming and lowercasing.
#[derive(Debug, Clone, Default)]
pub struct HallucinationFilter {
    phrases: Vec<String>,
}

impl HallucinationFilter {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.trim().to_lowercase()).collect(),
        }
    }
}

impl TextProcessor for HallucinationFilter {
    fn process(&self, text: &str) -> String {
        let lower = text.trim().to_lowercase();
        if self.phrases.iter().any(|p| *p == lower) {
            String::new()
        } else {
            text.to_string()
        }
    }

    fn name(&self) -> &'static str {
        "hallucination-filter"
    }
}

/// Capitalizes the first letter and terminates the text with a period
/// unless it already ends in sentence punctuation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceCase;

impl TextProcessor for SentenceCase {
    fn process(&self, text: &str) -> String {
        let trimmed = text.trim();
        let mut chars = trimmed.chars();
        let Some(first) = chars.next() else {
            return String::new();
        };

        let mut out: String = first.to_uppercase().chain(chars).collect();
        if !out.ends_with(['.', '!', '?', '…']) {
            out.push('.');
        }
        out
    }

    fn name(&self) -> &'static str {
        "sentence-case"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bracketed_markers() {
        let stripper = AnnotationStripper;
        assert_eq!(stripper.process("[MUSIC] hello (laughs) world"), "hello world");
        assert_eq!(stripper.process("*cough* okay"), "okay");
        assert_eq!(stripper.process("[BLANK_AUDIO]"), "");
    }

    #[test]
    fn test_unmatched_opener_is_kept() {
        let stripper = AnnotationStripper;
        assert_eq!(stripper.process("price (approx 5"), "price (approx 5");
        assert_eq!(stripper.process("a * b"), "a * b");
    }

    #[test]
    fn test_stripper_collapses_whitespace() {
        assert_eq!(AnnotationStripper.process("  a   [x]   b  "), "a b");
    }

    #[test]
    fn test_hallucination_filter_exact_match_only() {
        let filter = HallucinationFilter::new(&["Thank you.".to_string()]);
        assert_eq!(filter.process("thank you."), "");
        assert_eq!(filter.process("  THANK YOU. "), "");
        assert_eq!(filter.process("thank you for coming"), "thank you for coming");
    }

    #[test]
    fn test_sentence_case() {
        assert_eq!(SentenceCase.process("hello there"), "Hello there.");
        assert_eq!(SentenceCase.process("is it?"), "Is it?");
        assert_eq!(SentenceCase.process("Done."), "Done.");
        assert_eq!(SentenceCase.process("   "), "");
        assert_eq!(SentenceCase.process("über"), "Über.");
    }

    #[test]
    fn test_build_respects_config() {
        let config = TextConfig {
            strip_annotations: true,
            sentence_case: false,
            hallucination_filters: vec![],
        };
        let names: Vec<&str> = build_segment_filters(&config)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["annotation-stripper"]);
        assert!(build_post_processors(&config).is_empty());

        let all = TextConfig {
            strip_annotations: true,
            sentence_case: true,
            hallucination_filters: vec!["you".to_string()],
        };
        let filters: Vec<&str> = build_segment_filters(&all).iter().map(|p| p.name()).collect();
        assert_eq!(filters, vec!["annotation-stripper", "hallucination-filter"]);
        let names: Vec<&str> = build_post_processors(&all).iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["sentence-case"]);
    }

    #[test]
    fn test_apply_all_chains_in_order() {
        let processors: Vec<Box<dyn TextProcessor>> = vec![
            Box::new(AnnotationStripper),
            Box::new(HallucinationFilter::new(&["you".to_string()])),
            Box::new(SentenceCase),
        ];
        assert_eq!(apply_all(&processors, "[music] you"), "");
        assert_eq!(apply_all(&processors, "(noise) we agreed"), "We agreed.");
        assert_eq!(apply_all(&[], "untouched"), "untouched");
    }
}
