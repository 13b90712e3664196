//! The end-to-end extraction pipeline.
//!
//! Hybrid mode runs the token-classification spans through the resolver
//! and then adds story-pattern entities. Slm-only mode generates heuristic
//! candidates and lets the language model classify them before resolution.
//! Either way, span-extraction failures degrade to an empty entity list
//! rather than aborting the ingestion.

use super::classifier::EntityTypeClassifier;
use super::entity::{Entity, EntityType, Fact};
use super::facts::FactExtractor;
use super::resolver::{apply_story_patterns, EntityResolver};
use super::span::{HeuristicSpanExtractor, RawSpan, SpanExtractor};
use crate::config::{ExtractionConfig, ExtractionMode};
use slm::CompletionService;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Orchestrates span extraction, resolution, classification, and fact
/// attachment.
pub struct ExtractionPipeline {
    spans: Arc<dyn SpanExtractor>,
    config: ExtractionConfig,
    resolver: EntityResolver,
    classifier: EntityTypeClassifier,
    facts: FactExtractor,
    heuristic: HeuristicSpanExtractor,
}

impl ExtractionPipeline {
    /// Create a pipeline over the given span extractor and completion
    /// service.
    pub fn new(
        spans: Arc<dyn SpanExtractor>,
        completion: Arc<dyn CompletionService>,
        config: ExtractionConfig,
    ) -> Self {
        let resolver = EntityResolver::new(
            config.model_confidence_threshold,
            config.pattern_confidence,
        );
        let classifier = EntityTypeClassifier::new(Arc::clone(&completion), &config);
        let facts = FactExtractor::new(completion, &config);
        Self {
            spans,
            config,
            resolver,
            classifier,
            facts,
            heuristic: HeuristicSpanExtractor::default(),
        }
    }

    /// Extract entities from text. Never fails: an unavailable span model
    /// yields whatever the pattern passes can still find.
    pub async fn extract_entities(&self, text: &str, time_id: &str) -> Vec<Entity> {
        info!(
            text_len = text.len(),
            mode = ?self.config.mode,
            "extracting entities"
        );

        let entities = match self.config.mode {
            ExtractionMode::Hybrid => self.extract_hybrid(text, time_id).await,
            ExtractionMode::SlmOnly => self.extract_slm_only(text, time_id).await,
        };

        info!(count = entities.len(), "extraction finished");
        entities
    }

    async fn extract_hybrid(&self, text: &str, time_id: &str) -> Vec<Entity> {
        let spans = match self.spans.extract(text).await {
            Ok(spans) => spans,
            Err(e) => {
                error!(error = %e, "span extraction failed, continuing with patterns only");
                Vec::new()
            }
        };

        let mut entities = self.resolver.resolve(&spans, text, time_id);
        apply_story_patterns(&mut entities, text, time_id);
        entities
    }

    async fn extract_slm_only(&self, text: &str, time_id: &str) -> Vec<Entity> {
        let candidates = match self.heuristic.extract(text).await {
            Ok(spans) => spans,
            Err(e) => {
                error!(error = %e, "candidate generation failed");
                return Vec::new();
            }
        };

        let names: Vec<String> = candidates.iter().map(|s| s.surface.clone()).collect();
        let classified = self.classifier.classify_batch(&names, text).await;
        let types: HashMap<&str, EntityType> = classified
            .iter()
            .map(|(name, entity_type)| (name.as_str(), *entity_type))
            .collect();

        // Keep only candidates the model accepted, relabeled with its
        // verdict.
        let spans: Vec<RawSpan> = candidates
            .into_iter()
            .filter_map(|mut span| {
                let entity_type = types.get(span.surface.as_str())?;
                span.label = raw_label(*entity_type).to_string();
                Some(span)
            })
            .collect();

        self.resolver.resolve(&spans, text, time_id)
    }

    /// Extract facts for already-resolved entities.
    pub async fn extract_facts_for_entities(
        &self,
        text: &str,
        entities: &[Entity],
        time_id: &str,
    ) -> HashMap<String, Vec<Fact>> {
        self.facts.extract_facts(text, entities, time_id).await
    }

    /// Run the full extraction: entities with their facts attached.
    pub async fn extract(&self, text: &str, time_id: &str) -> Vec<Entity> {
        let mut entities = self.extract_entities(text, time_id).await;
        let mut facts = self
            .extract_facts_for_entities(text, &entities, time_id)
            .await;
        for entity in &mut entities {
            if let Some(entity_facts) = facts.remove(&entity.id) {
                entity.facts = entity_facts;
            }
        }
        entities
    }
}

/// Canonical raw label for a classified type, for re-entry into the
/// resolver's label mapping.
fn raw_label(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Character => "PER",
        EntityType::Location => "LOC",
        EntityType::Organization => "ORG",
        EntityType::Object => "PRODUCT",
        EntityType::Event => "EVENT",
        EntityType::Concept => "MISC",
    }
}
