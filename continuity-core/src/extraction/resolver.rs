//! Entity resolution: raw spans in, canonical merged entities out.
//!
//! Resolution filters spans (length, punctuation fragments, word-boundary
//! alignment, confidence), merges surface forms by `(type, normalized name)`,
//! and then consolidates lone surnames of characters into their full-name
//! entity. Drafts are kept in insertion order so the output is deterministic
//! for a given input.

use super::entity::{Entity, EntityType};
use super::names::{normalize_name, split_person_name, strip_possessive};
use super::patterns::find_story_entities;
use super::span::{RawSpan, SpanOrigin};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Working record during resolution. Ids are assigned at creation, so a
/// draft merged away leaves a gap in the id sequence.
struct Draft {
    id: String,
    entity_type: EntityType,
    name: String,
    confidence: f64,
    version: u32,
    seen_forms: BTreeSet<String>,
    alive: bool,
}

/// Merges and filters raw spans into canonical entities.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    model_confidence_threshold: f64,
    pattern_confidence_threshold: f64,
}

impl EntityResolver {
    /// Create a resolver with the given per-origin confidence thresholds.
    pub fn new(model_confidence_threshold: f64, pattern_confidence_threshold: f64) -> Self {
        Self {
            model_confidence_threshold,
            pattern_confidence_threshold,
        }
    }

    fn threshold_for(&self, origin: SpanOrigin) -> f64 {
        match origin {
            SpanOrigin::Model => self.model_confidence_threshold,
            SpanOrigin::Pattern => self.pattern_confidence_threshold,
        }
    }

    /// Resolve raw spans against the source text into merged entities.
    pub fn resolve(&self, spans: &[RawSpan], text: &str, time_id: &str) -> Vec<Entity> {
        let mut drafts: Vec<Draft> = Vec::new();
        let mut index: HashMap<(EntityType, String), usize> = HashMap::new();
        let mut counter = 1;

        for span in spans {
            let surface = span.surface.trim();
            if surface.chars().count() < 2 {
                continue;
            }
            // Punctuation fragments like ". -" survive the length check.
            let depunct: String = surface
                .chars()
                .filter(|c| !matches!(c, '.' | ',' | '-'))
                .collect();
            if depunct.trim().chars().count() < 2 {
                continue;
            }
            if !super::names::is_word_boundary(text, span.start, span.end) {
                debug!(
                    surface,
                    start = span.start,
                    end = span.end,
                    "rejecting non-boundary span"
                );
                continue;
            }

            let normalized = normalize_name(surface);
            // Single letters are noise; dotted abbreviations pass.
            if normalized.chars().count() == 1
                && normalized.chars().all(|c| c.is_alphabetic())
            {
                continue;
            }
            if span.confidence < self.threshold_for(span.origin) {
                continue;
            }

            let entity_type = EntityType::from_label(&span.label);
            let display = strip_possessive(surface).trim().to_string();
            let key = (entity_type, normalized);

            match index.get(&key) {
                None => {
                    let mut seen_forms = BTreeSet::new();
                    seen_forms.insert(display.clone());
                    drafts.push(Draft {
                        id: Entity::format_id(counter),
                        entity_type,
                        name: display,
                        confidence: span.confidence,
                        version: 1,
                        seen_forms,
                        alive: true,
                    });
                    index.insert(key, drafts.len() - 1);
                    counter += 1;
                }
                Some(&i) => {
                    // The first-seen surface form stays canonical.
                    let draft = &mut drafts[i];
                    draft.seen_forms.insert(display);
                    if span.confidence > draft.confidence {
                        draft.confidence = span.confidence;
                    }
                    draft.version += 1;
                }
            }
        }

        Self::consolidate_surnames(&mut drafts);

        drafts
            .into_iter()
            .filter(|d| d.alive)
            .map(|d| Self::finalize(d, time_id))
            .collect()
    }

    /// Merge lone-surname character drafts into their full-name draft.
    ///
    /// "Beethoven" and "Ludwig van Beethoven" share the last token, so the
    /// shorter form becomes an alias of the longer one. Among equal token
    /// counts the first-seen draft wins.
    fn consolidate_surnames(drafts: &mut [Draft]) {
        let mut surname_index: HashMap<String, usize> = HashMap::new();
        for (i, draft) in drafts.iter().enumerate() {
            if draft.entity_type != EntityType::Character {
                continue;
            }
            let (_, last, _) = split_person_name(&draft.name);
            if last.is_empty() {
                continue;
            }
            match surname_index.get(&last) {
                None => {
                    surname_index.insert(last, i);
                }
                Some(&prev) => {
                    let prev_tokens = drafts[prev].name.split_whitespace().count();
                    let this_tokens = draft.name.split_whitespace().count();
                    if prev_tokens < this_tokens {
                        surname_index.insert(last, i);
                    }
                }
            }
        }

        for i in 0..drafts.len() {
            if drafts[i].entity_type != EntityType::Character || !drafts[i].alive {
                continue;
            }
            let (_, last, _) = split_person_name(&drafts[i].name);
            if last.is_empty() {
                continue;
            }
            let Some(&canonical) = surname_index.get(&last) else {
                continue;
            };
            if canonical == i {
                continue;
            }

            let victim_name = drafts[i].name.clone();
            let victim_forms = std::mem::take(&mut drafts[i].seen_forms);
            let victim_confidence = drafts[i].confidence;
            drafts[i].alive = false;

            let canon = &mut drafts[canonical];
            canon.seen_forms.extend(victim_forms);
            canon.seen_forms.insert(victim_name);
            canon.version += 1;
            if victim_confidence > canon.confidence {
                canon.confidence = victim_confidence;
            }
        }
    }

    fn finalize(draft: Draft, time_id: &str) -> Entity {
        let mut entity = Entity::new(
            draft.id,
            draft.entity_type,
            draft.name.clone(),
            draft.confidence,
            time_id,
        );
        entity.version = draft.version;
        entity.aliases = draft
            .seen_forms
            .into_iter()
            .filter(|form| !form.is_empty() && *form != draft.name)
            .collect();
        entity
    }
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::new(0.85, 0.90)
    }
}

/// Hybrid second pass: add story-pattern entities for keys the resolved set
/// does not already contain. Pattern additions carry fixed confidence 0.90.
pub fn apply_story_patterns(entities: &mut Vec<Entity>, text: &str, time_id: &str) {
    let mut keys: std::collections::HashSet<(EntityType, String)> = entities
        .iter()
        .map(|e| (e.entity_type, normalize_name(&e.name)))
        .collect();
    // Surname merges leave gaps in the id sequence, so continue from the
    // highest assigned id rather than the entity count.
    let mut counter = entities
        .iter()
        .filter_map(|e| Entity::id_counter(&e.id))
        .max()
        .unwrap_or(0)
        + 1;

    for (entity_type, surface) in find_story_entities(text) {
        let normalized = normalize_name(&surface);
        if normalized.chars().count() < 2 {
            continue;
        }
        let key = (entity_type, normalized);
        if keys.contains(&key) {
            continue;
        }
        debug!(surface = %surface, entity_type = entity_type.name(), "pattern match");
        entities.push(Entity::new(
            Entity::format_id(counter),
            entity_type,
            strip_possessive(&surface),
            0.90,
            time_id,
        ));
        keys.insert(key);
        counter += 1;
    }
}
