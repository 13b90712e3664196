//! Story-specific entity patterns for the hybrid second pass.
//!
//! The token-classification model is trained on news text and misses
//! narrative constructions like "the lighthouse keeper" or "the Battle of
//! Aldora". These case-sensitive rules fill the gaps. They run in a fixed
//! order so extraction output is deterministic.

use super::entity::EntityType;
use once_cell::sync::Lazy;
use regex::Regex;

/// One pattern rule: the entity type it proposes and the regex that finds
/// mentions of it. The entity name is the whole match, trimmed.
pub struct StoryPattern {
    /// Type assigned to every match of this pattern.
    pub entity_type: EntityType,
    /// Matching rule, case-sensitive.
    pub regex: Regex,
}

fn pattern(entity_type: EntityType, re: &str) -> StoryPattern {
    StoryPattern {
        entity_type,
        regex: Regex::new(re).expect("story pattern regex"),
    }
}

/// The pattern library, in application order.
pub static STORY_PATTERNS: Lazy<Vec<StoryPattern>> = Lazy::new(|| {
    vec![
        // Roles and titles.
        pattern(
            EntityType::Character,
            r"\bthe\s+(lighthouse\s+keeper|king|queen|prince|princess|wizard|knight|merchant|captain|doctor|professor|detective|priest|monk|sailor|guard|soldier)\b",
        ),
        // Capitalized names followed by say/think verbs.
        pattern(
            EntityType::Character,
            r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s+(?:said|asked|replied|thought|wondered|remembered|knew|felt)\b",
        ),
        // Magical or special items.
        pattern(
            EntityType::Object,
            r"\b(Sacred|Magic|Ancient|Legendary|Cursed)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\b",
        ),
        pattern(
            EntityType::Object,
            r"\b([A-Z][a-z]+)\s+(Sword|Shield|Staff|Amulet|Ring|Crown|Orb)\b",
        ),
        // Common story objects.
        pattern(
            EntityType::Object,
            r"\b(?:the|a)\s+(letter|map|key|book|scroll|diary|journal|compass|lantern|mirror)\b",
        ),
        // Capitalized locations.
        pattern(
            EntityType::Location,
            r"\b([A-Z][a-z]+)\s+(Kingdom|Castle|Tower|Forest|Mountain|City|Village|Island|Bay|Harbor)\b",
        ),
        // Common locations.
        pattern(
            EntityType::Location,
            r"\b(?:the|a)\s+(lighthouse|tavern|inn|church|cathedral|library|market|square|bridge|gate|harbor|port)\b",
        ),
        // Named events.
        pattern(
            EntityType::Event,
            r"\b(Battle|War|Siege|Festival|Ceremony)\s+of\s+([A-Z][a-z]+)\b",
        ),
    ]
});

/// Run every pattern over `text` and yield `(entity_type, surface)` pairs
/// in library order. Surfaces are the full match, trimmed; no deduplication
/// happens here.
pub fn find_story_entities(text: &str) -> Vec<(EntityType, String)> {
    let mut found = Vec::new();
    for p in STORY_PATTERNS.iter() {
        for m in p.regex.find_iter(text) {
            found.push((p.entity_type, m.as_str().trim().to_string()));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_pattern() {
        let found = find_story_entities("Every night the lighthouse keeper climbed the stairs.");
        assert!(found
            .iter()
            .any(|(t, n)| *t == EntityType::Character && n == "the lighthouse keeper"));
    }

    #[test]
    fn test_say_verb_pattern() {
        let found = find_story_entities("Elena said nothing for a long while.");
        assert!(found
            .iter()
            .any(|(t, n)| *t == EntityType::Character && n.starts_with("Elena")));
    }

    #[test]
    fn test_event_pattern() {
        let found = find_story_entities("Songs still told of the Battle of Aldora.");
        assert!(found
            .iter()
            .any(|(t, n)| *t == EntityType::Event && n == "Battle of Aldora"));
    }

    #[test]
    fn test_location_pattern() {
        let found = find_story_entities("They rode toward Eldin Castle at dusk.");
        assert!(found
            .iter()
            .any(|(t, n)| *t == EntityType::Location && n == "Eldin Castle"));
    }

    #[test]
    fn test_case_sensitivity() {
        // Lowercase "battle of aldora" must not match the event pattern.
        let found = find_story_entities("they spoke of the battle of aldora");
        assert!(!found.iter().any(|(t, _)| *t == EntityType::Event));
    }

    #[test]
    fn test_fixed_order_is_stable() {
        let text = "The king took the map to Eldin Castle.";
        let first = find_story_entities(text);
        let second = find_story_entities(text);
        assert_eq!(first, second);
    }
}
