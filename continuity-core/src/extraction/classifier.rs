//! Entity-type classification and validation via the completion service.
//!
//! Used by slm-only mode, where heuristic candidates need the language
//! model to decide whether they are entities at all and what type they are.
//! Every call is independent: the gate resets generation state around each
//! one, candidates run in small batches with a forced reset and a short
//! pause in between, and a timed-out candidate is dropped rather than
//! retried.

use super::entity::EntityType;
use crate::config::ExtractionConfig;
use slm::{CompletionService, GenerationParams};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const TYPE_TOKENS: [&str; 7] = [
    "character",
    "location",
    "object",
    "event",
    "organization",
    "org",
    "concept",
];

/// Classifies and validates entity candidates with short, context-scoped
/// prompts.
pub struct EntityTypeClassifier {
    completion: Arc<dyn CompletionService>,
    temperature: f32,
    timeout: Duration,
    batch_size: usize,
    batch_delay: Duration,
}

impl EntityTypeClassifier {
    /// Create a classifier over the given completion service.
    pub fn new(completion: Arc<dyn CompletionService>, config: &ExtractionConfig) -> Self {
        Self {
            completion,
            temperature: config.classify_temperature,
            timeout: config.classify_timeout,
            batch_size: config.classify_batch_size.max(1),
            batch_delay: config.classify_batch_delay,
        }
    }

    fn params(&self) -> GenerationParams {
        GenerationParams::default()
            .with_temperature(self.temperature)
            .with_max_tokens(8)
            .with_stop(vec!["\n".to_string(), ".".to_string(), ",".to_string()])
            .with_timeout(self.timeout)
    }

    /// Classify a candidate name given the text it occurred in.
    ///
    /// Returns `None` for unrecognized output, generation errors, and
    /// timeouts; the caller drops the candidate.
    pub async fn classify(&self, candidate: &str, text: &str) -> Option<EntityType> {
        let context = context_window(text, candidate);
        let prompt = format!(
            "Text: \"{context}\"\n\nWhat type of entity is \"{candidate}\"? \
             Answer with exactly one word: character, location, object, event, \
             organization, or concept.\nAnswer:"
        );

        let response = self.call(&prompt, candidate).await?;
        let parsed = parse_type(&response);
        debug!(candidate, response = response.trim(), ?parsed, "classified candidate");
        parsed
    }

    /// Ask the model whether a candidate is an entity at all.
    ///
    /// Errors and timeouts reject the candidate.
    pub async fn validate(&self, candidate: &str, text: &str) -> bool {
        let context = context_window(text, candidate);
        let prompt = format!(
            "Text: \"{context}\"\n\nIs \"{candidate}\" a named story entity \
             (a character, place, object, event, or organization)? \
             Answer yes or no.\nAnswer:"
        );

        match self.call(&prompt, candidate).await {
            Some(response) => response.trim().to_lowercase().starts_with("yes"),
            None => false,
        }
    }

    /// Classify candidates in fixed-size batches, with a forced state reset
    /// and a brief pause between batches. Unclassifiable candidates are
    /// dropped from the result.
    pub async fn classify_batch(
        &self,
        candidates: &[String],
        text: &str,
    ) -> Vec<(String, EntityType)> {
        let mut classified = Vec::new();

        for (i, batch) in candidates.chunks(self.batch_size).enumerate() {
            if i > 0 {
                if let Err(e) = self.completion.reset().await {
                    warn!(error = %e, "state reset between batches failed");
                }
                tokio::time::sleep(self.batch_delay).await;
            }
            for candidate in batch {
                if let Some(entity_type) = self.classify(candidate, text).await {
                    classified.push((candidate.clone(), entity_type));
                }
            }
        }

        classified
    }

    /// One timed generation call. `None` means dropped.
    async fn call(&self, prompt: &str, candidate: &str) -> Option<String> {
        let params = self.params();
        match tokio::time::timeout(self.timeout, self.completion.generate(prompt, &params)).await {
            Ok(Ok(response)) => Some(response),
            Ok(Err(e)) => {
                warn!(candidate, error = %e, "classification call failed");
                None
            }
            Err(_) => {
                warn!(candidate, timeout = ?self.timeout, "classification call timed out");
                None
            }
        }
    }
}

/// Cut a small context window around the first occurrence of `candidate`,
/// or the first 50 characters of the text when it is absent.
fn context_window(text: &str, candidate: &str) -> String {
    let Some(pos) = text.find(candidate) else {
        return text.chars().take(50).collect();
    };
    let start = floor_char_boundary(text, pos.saturating_sub(15));
    let end = ceil_char_boundary(text, (pos + candidate.len() + 15).min(text.len()));
    text[start..end].to_string()
}

fn floor_char_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Parse a classification answer: exact keyword first, then substring.
fn parse_type(response: &str) -> Option<EntityType> {
    let lowered = response.trim().to_lowercase();
    let cleaned = lowered.trim_matches(|c: char| !c.is_alphanumeric());

    if let Some(entity_type) = EntityType::from_keyword(cleaned) {
        return Some(entity_type);
    }
    TYPE_TOKENS
        .iter()
        .find(|token| cleaned.contains(*token))
        .and_then(|token| EntityType::from_keyword(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingCompletion, ScriptedCompletion, StalledCompletion};

    fn classifier(service: Arc<dyn CompletionService>) -> EntityTypeClassifier {
        let config = ExtractionConfig::default()
            .with_classify_timeout(Duration::from_millis(50));
        EntityTypeClassifier::new(service, &config)
    }

    #[test]
    fn test_parse_type_exact_then_substring() {
        assert_eq!(parse_type("character"), Some(EntityType::Character));
        assert_eq!(parse_type(" Location.\n"), Some(EntityType::Location));
        assert_eq!(
            parse_type("it looks like an organization to me"),
            Some(EntityType::Organization)
        );
        assert_eq!(parse_type("org"), Some(EntityType::Organization));
        assert_eq!(parse_type("dragon"), None);
        assert_eq!(parse_type(""), None);
    }

    #[test]
    fn test_context_window() {
        let text = "Once upon a time, Elena Vasquez tended the lighthouse at the edge of town.";
        let window = context_window(text, "Elena Vasquez");
        assert!(window.contains("Elena Vasquez"));
        assert!(window.len() <= "Elena Vasquez".len() + 30);

        // Absent candidate falls back to the head of the text.
        let fallback = context_window(text, "Marcus");
        assert_eq!(fallback, text.chars().take(50).collect::<String>());
    }

    #[test]
    fn test_context_window_multibyte() {
        let text = "café ñandú Miró walked on";
        let window = context_window(text, "Miró");
        assert!(window.contains("Miró"));
    }

    #[tokio::test]
    async fn test_classify_parses_response() {
        let service = Arc::new(ScriptedCompletion::new(["character"]));
        let c = classifier(service);
        let result = c.classify("Elena", "Elena sailed north.").await;
        assert_eq!(result, Some(EntityType::Character));
    }

    #[tokio::test]
    async fn test_classify_drops_unrecognized_output() {
        let service = Arc::new(ScriptedCompletion::new(["I am not sure."]));
        let c = classifier(service);
        assert_eq!(c.classify("Elena", "Elena sailed north.").await, None);
    }

    #[tokio::test]
    async fn test_classify_drops_on_error() {
        let c = classifier(Arc::new(FailingCompletion));
        assert_eq!(c.classify("Elena", "Elena sailed north.").await, None);
    }

    #[tokio::test]
    async fn test_classify_drops_on_timeout() {
        let c = classifier(Arc::new(StalledCompletion));
        assert_eq!(c.classify("Elena", "Elena sailed north.").await, None);
    }

    #[tokio::test]
    async fn test_validate() {
        let service = Arc::new(ScriptedCompletion::new(["Yes", "no"]));
        let c = classifier(service);
        assert!(c.validate("Elena", "Elena sailed north.").await);
        assert!(!c.validate("Tuesday", "On Tuesday it rained.").await);
    }

    #[tokio::test]
    async fn test_validate_rejects_on_timeout() {
        let c = classifier(Arc::new(StalledCompletion));
        assert!(!c.validate("Elena", "Elena sailed north.").await);
    }

    #[tokio::test]
    async fn test_batch_resets_between_batches() {
        let service = Arc::new(ScriptedCompletion::new([
            "character",
            "location",
            "object",
            "event",
        ]));
        let mut config = ExtractionConfig::default()
            .with_classify_timeout(Duration::from_millis(50));
        config.classify_batch_size = 2;
        config.classify_batch_delay = Duration::from_millis(1);
        let c = EntityTypeClassifier::new(service.clone(), &config);

        let candidates: Vec<String> = ["Elena", "Harbor", "Lantern", "Festival"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let classified = c
            .classify_batch(&candidates, "Elena left Harbor with a Lantern for the Festival.")
            .await;

        assert_eq!(classified.len(), 4);
        // Two batches of two: exactly one reset between them.
        assert_eq!(service.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_drops_unclassified_candidates() {
        let service = Arc::new(ScriptedCompletion::new(["character", "gibberish"]));
        let c = classifier(service);
        let candidates = vec!["Elena".to_string(), "Blorp".to_string()];
        let classified = c.classify_batch(&candidates, "Elena met Blorp.").await;
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].0, "Elena");
    }
}
