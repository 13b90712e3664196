//! Regex fact rules, used as a fallback when the model returns no facts
//! for a mention sentence.
//!
//! Each rule is a swappable strategy behind the [`FactRule`] trait so the
//! library can be extended or replaced without touching the extractor.

use super::entity::{Evidence, Fact, FactMethod};
use super::names::{canonical_form, split_person_name, token_count};
use super::sentence::Sentence;
use once_cell::sync::Lazy;
use regex::Regex;

/// A pattern rule deriving facts about a named entity from one sentence.
pub trait FactRule: Send + Sync {
    /// Rule name, for logging.
    fn name(&self) -> &'static str;

    /// Extract facts about `entity_name` from the sentence.
    fn extract(
        &self,
        entity_name: &str,
        aliases: &[String],
        sentence: &Sentence,
        time_id: &str,
    ) -> Vec<Fact>;
}

/// The default rule library: apposition, possessive noun phrase, and a
/// lightweight subject-verb-object pattern.
pub fn default_rules() -> Vec<Box<dyn FactRule>> {
    vec![
        Box::new(AppositionRule),
        Box::new(PossessiveRule),
        Box::new(SvoRule),
    ]
}

/// Does a name found in text refer to the target entity? Compares canonical
/// forms of the full name, the surname (for multi-token names), and aliases.
fn name_matches(target: &str, text_name: &str, aliases: &[String]) -> bool {
    let t = canonical_form(target);
    let x = canonical_form(text_name);
    if t == x {
        return true;
    }
    if token_count(target) >= 2 {
        let (_, last, _) = split_person_name(target);
        if canonical_form(&last) == x {
            return true;
        }
    }
    aliases.iter().any(|a| canonical_form(a) == x)
}

// Apposition: "Ludwig van Beethoven, a German composer, ..."
static APPOSITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<name>[A-Z][\w\-]*(?:\s+(?:van|von|de|del|da|di|la|le))?(?:\s+[A-Z][\w\-]+)?)\s*,\s+(?P<role>(?:the|a|an)\s+[a-z][^,]+?),",
    )
    .expect("apposition regex")
});

/// "Name, a role," -> "Name is a role."
pub struct AppositionRule;

impl FactRule for AppositionRule {
    fn name(&self) -> &'static str {
        "apposition"
    }

    fn extract(
        &self,
        entity_name: &str,
        aliases: &[String],
        sentence: &Sentence,
        time_id: &str,
    ) -> Vec<Fact> {
        let mut facts = Vec::new();
        for caps in APPOSITION.captures_iter(&sentence.text) {
            if name_matches(entity_name, &caps["name"], aliases) {
                let role = caps["role"].trim();
                facts.push(Fact::new(
                    format!("{entity_name} is {role}."),
                    sentence.text.clone(),
                    Evidence::new(time_id, sentence.start, sentence.end),
                    0.74,
                    FactMethod::Rule,
                ));
            }
        }
        facts
    }
}

// Possessive noun phrase: "Beethoven's early period ..."
static POSSESSIVE_NP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<name>[A-Z][\w\-]*(?:\s+[A-Z][\w\-]+)*)[’']s\s+(?P<object>(?:[a-z]+(?:\s+|\-))+[a-z]+)",
    )
    .expect("possessive regex")
});
static PERIOD_FOLLOWS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*period\b").expect("period regex"));
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("space regex"));

/// "Name's object" -> "Name has object." Bare temporal adjectives
/// ("early"/"middle"/"late") only count when followed by "period".
pub struct PossessiveRule;

impl FactRule for PossessiveRule {
    fn name(&self) -> &'static str {
        "possessive"
    }

    fn extract(
        &self,
        entity_name: &str,
        aliases: &[String],
        sentence: &Sentence,
        time_id: &str,
    ) -> Vec<Fact> {
        let mut facts = Vec::new();
        for caps in POSSESSIVE_NP.captures_iter(&sentence.text) {
            if !name_matches(entity_name, &caps["name"], aliases) {
                continue;
            }
            let mut object = MULTI_SPACE
                .replace_all(caps["object"].trim(), " ")
                .to_string();
            if matches!(object.to_lowercase().as_str(), "early" | "middle" | "late") {
                let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
                if PERIOD_FOLLOWS.is_match(&sentence.text[whole..]) {
                    object.push_str(" period");
                } else {
                    continue;
                }
            }
            facts.push(Fact::new(
                format!("{entity_name} has {object}."),
                sentence.text.clone(),
                Evidence::new(time_id, sentence.start, sentence.end),
                0.70,
                FactMethod::Rule,
            ));
        }
        facts
    }
}

// Lightweight SVO: "Ludwig van Beethoven was a German composer ..."
static SVO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<name>[A-Z][\w\-]*(?:\s+(?:van|von|de|del|da|di|la|le))?(?:\s+[A-Z][\w\-]+)*)\s+(?P<verb>(?:is|was|leads|led|holds|held|owns|owned|built|builds|found|finds|discovered|discovers|guards|guarded|sails|sailed|manages|managed|directs|directed))\s+(?P<object>[^,.;:]{1,60})",
    )
    .expect("svo regex")
});

/// "Name <verb> object" over a fixed verb list.
pub struct SvoRule;

impl FactRule for SvoRule {
    fn name(&self) -> &'static str {
        "svo"
    }

    fn extract(
        &self,
        entity_name: &str,
        aliases: &[String],
        sentence: &Sentence,
        time_id: &str,
    ) -> Vec<Fact> {
        let mut facts = Vec::new();
        for caps in SVO.captures_iter(&sentence.text) {
            if name_matches(entity_name, &caps["name"], aliases) {
                let verb = caps["verb"].trim().to_lowercase();
                let object = caps["object"].trim();
                facts.push(Fact::new(
                    format!("{entity_name} {verb} {object}."),
                    sentence.text.clone(),
                    Evidence::new(time_id, sentence.start, sentence.end),
                    0.70,
                    FactMethod::Rule,
                ));
            }
        }
        facts
    }
}
