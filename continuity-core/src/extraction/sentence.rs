//! Sentence splitting with byte-offset spans.
//!
//! The default splitter is a deliberately simple punctuation rule: split
//! after `.`, `!`, `?` followed by whitespace or end-of-string. It will
//! mis-split on abbreviations ("Dr. Moreno" becomes two sentences); that is
//! a documented limitation of the heuristic, and the trait seam exists so a
//! proper sentence-boundary model can replace it without touching the
//! extractor contracts.

use once_cell::sync::Lazy;
use regex::Regex;

/// A sentence span: `text == source[start..end]` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Byte offset of the sentence start in the source text.
    pub start: usize,
    /// Byte offset one past the sentence end.
    pub end: usize,
    /// The sentence text.
    pub text: String,
}

/// Strategy trait for sentence splitting.
pub trait SentenceSplitter: Send + Sync {
    /// Split `text` into sentences with byte-offset spans.
    fn split(&self, text: &str) -> Vec<Sentence>;
}

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?](?:\s+|$)").expect("sentence regex"));

/// Punctuation-rule splitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSplitter;

impl PunctuationSplitter {
    /// Turn `[cursor, raw_end)` into a trimmed sentence span, if non-empty.
    fn push_trimmed(text: &str, cursor: usize, raw_end: usize, out: &mut Vec<Sentence>) {
        let chunk = &text[cursor..raw_end];
        let trimmed = chunk.trim();
        if trimmed.is_empty() {
            return;
        }
        // Shift the span onto the trimmed content so evidence offsets
        // reproduce the sentence text exactly.
        let lead = chunk.len() - chunk.trim_start().len();
        let start = cursor + lead;
        let end = start + trimmed.len();
        out.push(Sentence {
            start,
            end,
            text: trimmed.to_string(),
        });
    }
}

impl SentenceSplitter for PunctuationSplitter {
    fn split(&self, text: &str) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut cursor = 0;

        for m in SENTENCE_END.find_iter(text) {
            Self::push_trimmed(text, cursor, m.end(), &mut sentences);
            cursor = m.end();
        }
        if cursor < text.len() {
            Self::push_trimmed(text, cursor, text.len(), &mut sentences);
        }

        sentences
    }
}
