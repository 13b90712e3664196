//! Name canonicalization and span sanity helpers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lowercase particles that can appear inside a person's full name.
const PERSON_PARTICLES: &[&str] = &["van", "von", "de", "del", "da", "di", "la", "le"];

static POSSESSIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[’']s\b").expect("possessive regex"));
static TRAILING_POSSESSIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:'s|’s)$").expect("trailing possessive regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Normalize possessives like "Goldstein's" / "Goldstein’s" to "Goldstein".
///
/// Interior apostrophes that are not possessive markers ("O'Connor") are
/// left alone.
pub fn strip_possessive(name: &str) -> String {
    POSSESSIVE.replace_all(name.trim(), "").to_string()
}

/// Lowercase + strip possessive + collapse whitespace. This is the
/// deduplication key for entity names; display names keep their casing.
pub fn normalize_name(name: &str) -> String {
    let stripped = strip_possessive(name);
    WHITESPACE
        .replace_all(stripped.trim(), " ")
        .to_lowercase()
}

/// Return true if `[start, end)` aligns with word boundaries in `text`.
///
/// Prevents accepting subword fragments like "tal" from "Continental".
/// Offsets are byte positions; off-char-boundary offsets never align.
pub fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    if start > end || end > text.len() {
        return false;
    }
    if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
        return false;
    }
    let left_ok = start == 0
        || !text[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric());
    let right_ok = end == text.len()
        || !text[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric());
    left_ok && right_ok
}

/// Split a person name into (tokens, lowercased last token, has_particle).
///
/// "Ludwig van Beethoven" -> (["Ludwig", "van", "Beethoven"], "beethoven", true)
pub fn split_person_name(name: &str) -> (Vec<&str>, String, bool) {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let Some(last) = tokens.last() else {
        return (tokens, String::new(), false);
    };
    let last_lower = last.to_lowercase();
    let has_particle = tokens[..tokens.len() - 1]
        .iter()
        .any(|t| PERSON_PARTICLES.contains(&t.to_lowercase().as_str()));
    (tokens.clone(), last_lower, has_particle)
}

/// Number of whitespace-separated tokens in a name.
pub fn token_count(name: &str) -> usize {
    name.split_whitespace().count()
}

/// Canonical comparison form used by fact rules: trim surrounding
/// punctuation, strip a trailing possessive marker, lowercase.
pub fn canonical_form(s: &str) -> String {
    let trimmed = s.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '!' | '?' | '"' | '“' | '”' | '\'' | '’')
    });
    TRAILING_POSSESSIVE.replace(trimmed, "").to_lowercase()
}
