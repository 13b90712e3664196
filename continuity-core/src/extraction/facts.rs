//! Sentence-scoped fact extraction.
//!
//! For each entity, the extractor finds the sentences that mention it,
//! asks the completion service for facts constrained to one sentence at a
//! time, and recovers a structured list from whatever text comes back.
//! Generation failures degrade to zero facts; the optional rule library
//! covers sentences the model returned nothing for.

use super::entity::{Entity, Evidence, Fact, FactMethod};
use super::json_repair::recover_facts;
use super::rules::{default_rules, FactRule};
use super::sentence::{PunctuationSplitter, Sentence, SentenceSplitter};
use crate::config::ExtractionConfig;
use regex::Regex;
use slm::{CompletionService, GenerationParams};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Extracts facts for resolved entities from their mention sentences.
pub struct FactExtractor {
    completion: Arc<dyn CompletionService>,
    splitter: Box<dyn SentenceSplitter>,
    rules: Vec<Box<dyn FactRule>>,
    use_llm: bool,
    rules_fallback: bool,
    max_facts_per_entity: usize,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl FactExtractor {
    /// Create a fact extractor over the given completion service.
    pub fn new(completion: Arc<dyn CompletionService>, config: &ExtractionConfig) -> Self {
        Self {
            completion,
            splitter: Box::new(PunctuationSplitter),
            rules: default_rules(),
            use_llm: config.use_llm_facts,
            rules_fallback: config.rules_fallback,
            max_facts_per_entity: config.max_facts_per_entity,
            temperature: config.fact_temperature,
            max_tokens: config.fact_max_tokens,
            timeout: config.fact_timeout,
        }
    }

    /// Replace the sentence splitter.
    pub fn with_splitter(mut self, splitter: Box<dyn SentenceSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    /// Extract facts for every entity; returns a map from entity id to its
    /// deduplicated, capped fact list. Entities without mentions map to an
    /// empty list.
    pub async fn extract_facts(
        &self,
        text: &str,
        entities: &[Entity],
        time_id: &str,
    ) -> HashMap<String, Vec<Fact>> {
        let sentences = self.splitter.split(text);
        let mut results = HashMap::new();

        for entity in entities {
            let name = entity.name.trim();
            if name.is_empty() {
                continue;
            }

            let mentions = match mention_pattern(name, &entity.aliases) {
                Some(pattern) => sentences
                    .iter()
                    .filter(|s| pattern.is_match(&s.text))
                    .collect::<Vec<_>>(),
                None => Vec::new(),
            };
            debug!(
                entity = name,
                mention_sentences = mentions.len(),
                "collecting facts"
            );

            let mut facts: Vec<Fact> = Vec::new();
            for sentence in mentions {
                let llm_facts = if self.use_llm {
                    self.llm_facts_for_sentence(name, &sentence.text).await
                } else {
                    Vec::new()
                };
                for fact_text in &llm_facts {
                    facts.push(Fact::new(
                        fact_text.clone(),
                        sentence.text.clone(),
                        Evidence::new(time_id, sentence.start, sentence.end),
                        0.80,
                        FactMethod::Llm,
                    ));
                }

                if self.rules_fallback && llm_facts.is_empty() {
                    facts.extend(self.rule_facts(name, &entity.aliases, sentence, time_id));
                }

                if facts.len() >= self.max_facts_per_entity {
                    break;
                }
            }

            results.insert(entity.id.clone(), dedup_and_cap(facts, self.max_facts_per_entity));
        }

        results
    }

    /// One constrained-JSON extraction call; errors and timeouts yield no
    /// facts.
    async fn llm_facts_for_sentence(&self, name: &str, sentence: &str) -> Vec<String> {
        let prompt = format!(
            "You extract facts strictly from the given sentence.\n\
             Target entity: {name}\n\
             Return JSON ONLY with EXACTLY this schema:\n\
             {{ \"facts\": [\"<fact-1>\", \"<fact-2>\"] }}\n\
             Rules:\n\
             - Include 0-3 facts explicitly supported by THIS sentence.\n\
             - No external knowledge.\n\
             - Use DOUBLE quotes. Do NOT use single quotes.\n\
             - Do NOT include markdown, code fences, or any text outside the JSON object.\n\
             - If no facts, return {{\"facts\": []}} exactly.\n\n\
             Sentence: {sentence}\n\
             Example output: {{\"facts\": [\"Ludwig van Beethoven was a German composer.\", \
             \"His early period lasted until 1802.\"]}}"
        );
        let params = GenerationParams::default()
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_timeout(self.timeout);

        let call = self.completion.generate_json(&prompt, &params);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(raw)) => recover_facts(&raw),
            Ok(Err(e)) => {
                warn!(entity = name, error = %e, "fact extraction call failed");
                Vec::new()
            }
            Err(_) => {
                warn!(entity = name, timeout = ?self.timeout, "fact extraction call timed out");
                Vec::new()
            }
        }
    }

    /// Run the rule library over one sentence, deduplicating by fact text
    /// within the sentence.
    fn rule_facts(
        &self,
        name: &str,
        aliases: &[String],
        sentence: &Sentence,
        time_id: &str,
    ) -> Vec<Fact> {
        let mut facts = Vec::new();
        let mut seen = HashSet::new();
        for rule in &self.rules {
            for fact in rule.extract(name, aliases, sentence, time_id) {
                if seen.insert(fact.fact.trim().to_lowercase()) {
                    facts.push(fact);
                }
            }
        }
        facts
    }
}

/// Build the mention regex for a name: the full name, its last token (for
/// multi-token names), and every distinct alias, word-bounded with an
/// optional trailing possessive. Returns `None` for a name that produces an
/// invalid pattern.
fn mention_pattern(name: &str, aliases: &[String]) -> Option<Regex> {
    let mut variants = vec![regex::escape(name)];
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() >= 2 {
        variants.push(regex::escape(parts[parts.len() - 1]));
    }
    for alias in aliases {
        if !alias.is_empty() && alias.to_lowercase() != name.to_lowercase() {
            variants.push(regex::escape(alias));
        }
    }
    let pattern = format!(r"(?i)\b(?:{})(?:'s|’s)?\b", variants.join("|"));
    Regex::new(&pattern).ok()
}

/// Deduplicate by (normalized fact text, evidence span) preserving order,
/// then cap.
fn dedup_and_cap(facts: Vec<Fact>, cap: usize) -> Vec<Fact> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Fact> = facts
        .into_iter()
        .filter(|f| seen.insert(f.dedup_key()))
        .collect();
    unique.truncate(cap);
    unique
}
