//! Raw candidate spans and the span-extraction boundary.
//!
//! The token-classification model itself lives outside the core; it is
//! consumed through the [`SpanExtractor`] trait. The heuristic extractor
//! here is the model-free fallback used by slm-only mode.

use crate::error::ExtractionResult;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Where a candidate span came from; determines its confidence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanOrigin {
    /// Produced by the token-classification model.
    Model,
    /// Produced by a pattern rule.
    Pattern,
}

/// A contiguous byte range in the source text believed to name an entity,
/// not yet validated or classified.
#[derive(Debug, Clone)]
pub struct RawSpan {
    /// Byte offset of the span start.
    pub start: usize,
    /// Byte offset one past the span end.
    pub end: usize,
    /// Surface form as reported by the extractor.
    pub surface: String,
    /// Model-reported label string (PER, LOC, ORG, MISC, ...).
    pub label: String,
    /// Extractor-reported confidence in [0, 1].
    pub confidence: f64,
    /// Derivation origin.
    pub origin: SpanOrigin,
}

impl RawSpan {
    /// Create a model-derived span.
    pub fn model(
        start: usize,
        end: usize,
        surface: impl Into<String>,
        label: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            start,
            end,
            surface: surface.into(),
            label: label.into(),
            confidence,
            origin: SpanOrigin::Model,
        }
    }

    /// Create a pattern-derived span.
    pub fn pattern(
        start: usize,
        end: usize,
        surface: impl Into<String>,
        label: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            start,
            end,
            surface: surface.into(),
            label: label.into(),
            confidence,
            origin: SpanOrigin::Pattern,
        }
    }
}

/// Black-box span extraction service (NER model output).
#[async_trait]
pub trait SpanExtractor: Send + Sync {
    /// Run the model over `text` and return raw candidate spans.
    async fn extract(&self, text: &str) -> ExtractionResult<Vec<RawSpan>>;
}

static CAPITALIZED_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("candidate regex"));

/// Sentence-leading words and pronouns that capitalization alone would
/// mistake for names.
static COMMON_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "The", "And", "But", "Once", "A", "An", "In", "On", "At", "By", "With", "For", "They",
        "He", "She", "It", "We", "You", "I", "That", "This", "Which", "Who", "What", "Until",
        "Their", "Over", "All", "When", "Where", "Why", "How",
    ]
    .into_iter()
    .collect()
});

/// Model-free candidate generator: capitalized word runs, filtered against
/// common sentence-leading words. Used by slm-only mode, where the language
/// model validates each candidate afterwards.
pub struct HeuristicSpanExtractor {
    confidence: f64,
}

impl HeuristicSpanExtractor {
    /// Create an extractor assigning the given confidence to every candidate.
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }
}

impl Default for HeuristicSpanExtractor {
    fn default() -> Self {
        // Matches the pattern-derived threshold so candidates survive
        // resolver filtering.
        Self::new(0.90)
    }
}

#[async_trait]
impl SpanExtractor for HeuristicSpanExtractor {
    async fn extract(&self, text: &str) -> ExtractionResult<Vec<RawSpan>> {
        let mut spans = Vec::new();
        let mut seen = HashSet::new();

        for m in CAPITALIZED_RUN.find_iter(text) {
            let surface = m.as_str();
            if surface.chars().count() <= 2 || COMMON_WORDS.contains(surface) {
                continue;
            }
            if !seen.insert(surface.to_string()) {
                continue;
            }
            spans.push(RawSpan::pattern(
                m.start(),
                m.end(),
                surface,
                "PER",
                self.confidence,
            ));
        }

        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_heuristic_finds_capitalized_names() {
        let extractor = HeuristicSpanExtractor::default();
        let text = "Once upon a time, Elena Vasquez sailed past Harbor Point. The wind howled.";
        let spans = extractor.extract(text).await.unwrap();

        let surfaces: Vec<&str> = spans.iter().map(|s| s.surface.as_str()).collect();
        assert!(surfaces.contains(&"Elena Vasquez"));
        assert!(surfaces.contains(&"Harbor Point"));
        assert!(!surfaces.contains(&"Once"));
        assert!(!surfaces.contains(&"The"));
    }

    #[tokio::test]
    async fn test_heuristic_deduplicates_surfaces() {
        let extractor = HeuristicSpanExtractor::default();
        let spans = extractor
            .extract("Elena met Elena again. Elena laughed.")
            .await
            .unwrap();
        assert_eq!(spans.len(), 1);
    }

    #[tokio::test]
    async fn test_heuristic_span_offsets_match_text() {
        let extractor = HeuristicSpanExtractor::default();
        let text = "Captain Reyes docked at dawn.";
        let spans = extractor.extract(text).await.unwrap();
        for span in &spans {
            assert_eq!(&text[span.start..span.end], span.surface);
        }
    }
}
