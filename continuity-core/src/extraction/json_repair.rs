//! Tolerant JSON recovery for unreliable model output.
//!
//! Local models frequently wrap their output in markdown fences, use
//! typographic quotes, or fall back to Python-style single-quoted dicts.
//! Recovery is an ordered chain of strategies, each independently testable:
//! fence-strip -> brace-extract -> quote-normalize -> strict parse ->
//! single-quote retype -> list-salvage -> give up. Giving up yields
//! `{"facts": []}`; recovery never raises.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

static SINGLE_QUOTED_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<pre>[\{,\s])'(?P<key>\w+)'(?P<post>\s*:)").expect("key regex")
});
static SINGLE_QUOTED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\s*'([^'\n]*)'").expect("value regex"));
static QUOTED_STRING_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[(?:\s*".*?"\s*)(?:,\s*".*?"\s*)*\]"#).expect("list regex")
});
static SINGLE_QUOTED_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?:\s*'.*?'\s*)(?:,\s*'.*?'\s*)*\]").expect("single list regex")
});
static SINGLE_QUOTED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'([^']*)'").expect("single item regex"));

/// Strip markdown code-fence wrappers (```json ... ```).
pub(crate) fn strip_code_fences(raw: &str) -> String {
    let s = raw.trim().replace("```json", "```").replace("```JSON", "```");
    if s.starts_with("```") && s.ends_with("```") {
        s.trim_matches('`').trim().to_string()
    } else {
        s
    }
}

/// Extract the substring between the first `{` and the last `}`, if both
/// exist in order.
pub(crate) fn extract_braces(s: &str) -> &str {
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if end > start => &s[start..=end],
        _ => s,
    }
}

/// Normalize typographic quotes to straight quotes.
pub(crate) fn normalize_quotes(s: &str) -> String {
    s.replace(['“', '”'], "\"").replace(['’', '‛'], "'")
}

/// Rewrite single-quoted keys and single-quoted string values to
/// double-quoted equivalents, escaping embedded double quotes.
pub(crate) fn requote_single(s: &str) -> String {
    let keys_fixed = SINGLE_QUOTED_KEY.replace_all(s, "$pre\"$key\"$post");
    SINGLE_QUOTED_VALUE
        .replace_all(&keys_fixed, |caps: &regex::Captures| {
            format!(":\"{}\"", caps[1].replace('"', "\\\""))
        })
        .to_string()
}

/// Find a bracketed list of quoted strings and parse it. Double-quoted
/// lists are tried first; single-quoted lists (a common local-model habit)
/// are salvaged element by element.
pub(crate) fn salvage_list(s: &str) -> Option<Vec<String>> {
    if let Some(m) = QUOTED_STRING_LIST.find(s) {
        if let Ok(items) = serde_json::from_str(m.as_str()) {
            return Some(items);
        }
    }
    let m = SINGLE_QUOTED_LIST.find(s)?;
    Some(
        SINGLE_QUOTED_ITEM
            .captures_iter(m.as_str())
            .map(|caps| caps[1].to_string())
            .collect(),
    )
}

/// Recover a JSON value from raw model output.
///
/// Returns whatever the first successful strategy parses; if every strategy
/// fails, returns `{"facts": []}`.
pub fn recover(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({ "facts": [] });
    }

    let defenced = strip_code_fences(raw);
    let braced = extract_braces(&defenced);
    let normalized = normalize_quotes(braced);

    if let Ok(value) = serde_json::from_str::<Value>(&normalized) {
        return value;
    }

    let requoted = requote_single(&normalized);
    if let Ok(value) = serde_json::from_str::<Value>(&requoted) {
        return value;
    }

    if let Some(items) = salvage_list(&normalized) {
        return json!({ "facts": items });
    }

    json!({ "facts": [] })
}

/// Recover the fact strings from raw model output. Non-string and empty
/// entries are dropped.
pub fn recover_facts(raw: &str) -> Vec<String> {
    let value = recover(raw);
    let Some(items) = value.get("facts").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_json_passes_through() {
        assert_eq!(
            recover(r#"{"facts": ["A."]}"#),
            json!({ "facts": ["A."] })
        );
    }

    #[test]
    fn test_fenced_single_quoted_output() {
        let raw = "```json\n{'facts': ['A.']}\n```";
        assert_eq!(recover(raw), json!({ "facts": ["A."] }));
    }

    #[test]
    fn test_garbage_degrades_to_empty() {
        assert_eq!(recover("no json here"), json!({ "facts": [] }));
        assert_eq!(recover(""), json!({ "facts": [] }));
        assert_eq!(recover("   "), json!({ "facts": [] }));
    }

    #[test]
    fn test_prose_wrapped_object() {
        let raw = r#"Sure! Here is the JSON you asked for: {"facts": ["Elena owns a boat."]} Hope that helps."#;
        assert_eq!(recover(raw), json!({ "facts": ["Elena owns a boat."] }));
    }

    #[test]
    fn test_typographic_quotes() {
        let raw = "{“facts”: [“Elena owns a boat.”]}";
        assert_eq!(recover(raw), json!({ "facts": ["Elena owns a boat."] }));
    }

    #[test]
    fn test_single_quoted_value_with_embedded_double_quote() {
        let raw = r#"{'facts': ['She said "hello" twice.']}"#;
        assert_eq!(
            recover(raw),
            json!({ "facts": ["She said \"hello\" twice."] })
        );
    }

    #[test]
    fn test_single_quoted_list_salvage() {
        let raw = "the facts are ['Elena sailed north.', 'The storm followed.']";
        assert_eq!(
            recover(raw),
            json!({ "facts": ["Elena sailed north.", "The storm followed."] })
        );
    }

    #[test]
    fn test_list_salvage() {
        let raw = r#"facts = ["Elena sailed north.", "The storm followed."]"#;
        assert_eq!(
            recover(raw),
            json!({ "facts": ["Elena sailed north.", "The storm followed."] })
        );
    }

    #[test]
    fn test_fence_strip_step() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn test_brace_extract_step() {
        assert_eq!(extract_braces("noise {\"a\": 1} more"), "{\"a\": 1}");
        assert_eq!(extract_braces("no braces"), "no braces");
        assert_eq!(extract_braces("} reversed {"), "} reversed {");
    }

    #[test]
    fn test_requote_step() {
        assert_eq!(requote_single("{'facts': []}"), "{\"facts\": []}");
        assert_eq!(requote_single(r#"{"a": 'b'}"#), r#"{"a": "b"}"#);
    }

    #[test]
    fn test_recover_facts_filters_non_strings() {
        let facts = recover_facts(r#"{"facts": ["A.", 42, "", "  ", "B."]}"#);
        assert_eq!(facts, vec!["A.".to_string(), "B.".to_string()]);
    }

    #[test]
    fn test_recover_facts_missing_key() {
        assert!(recover_facts(r#"{"answer": "none"}"#).is_empty());
    }
}
