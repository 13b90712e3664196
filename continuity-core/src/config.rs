//! Configuration for the extraction pipeline.

use std::str::FromStr;
use std::time::Duration;

/// How entity candidates are generated and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// Token-classification spans plus story-pattern rules.
    #[default]
    Hybrid,
    /// Heuristic candidates validated by the small language model
    /// (no NER model required).
    SlmOnly,
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hybrid" => Ok(ExtractionMode::Hybrid),
            "slm-only" => Ok(ExtractionMode::SlmOnly),
            other => Err(format!(
                "Invalid extraction mode: {other}. Must be 'hybrid' or 'slm-only'"
            )),
        }
    }
}

/// Tunables for the extraction pipeline.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Candidate generation mode.
    pub mode: ExtractionMode,
    /// Minimum confidence for model-derived spans.
    pub model_confidence_threshold: f64,
    /// Confidence assigned to (and required of) pattern-derived spans.
    pub pattern_confidence: f64,
    /// Use the language model as the primary fact extractor.
    pub use_llm_facts: bool,
    /// Apply regex fact rules when the model returns no facts for a sentence.
    pub rules_fallback: bool,
    /// Hard cap on facts per entity.
    pub max_facts_per_entity: usize,
    /// Decoding temperature for fact extraction.
    pub fact_temperature: f32,
    /// Token budget for fact extraction.
    pub fact_max_tokens: usize,
    /// Deadline for a single fact-extraction call.
    pub fact_timeout: Duration,
    /// Decoding temperature for candidate classification.
    pub classify_temperature: f32,
    /// Deadline for a single classification call; expiry rejects the
    /// candidate, it is never retried.
    pub classify_timeout: Duration,
    /// Candidates per classification batch.
    pub classify_batch_size: usize,
    /// Pause between classification batches.
    pub classify_batch_delay: Duration,
    /// Characters per indexing chunk.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Documents retrieved per RAG query.
    pub top_k_results: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::Hybrid,
            model_confidence_threshold: 0.85,
            pattern_confidence: 0.90,
            use_llm_facts: true,
            rules_fallback: false,
            max_facts_per_entity: 3,
            fact_temperature: 0.2,
            fact_max_tokens: 160,
            fact_timeout: Duration::from_secs(120),
            classify_temperature: 0.1,
            classify_timeout: Duration::from_secs(10),
            classify_batch_size: 3,
            classify_batch_delay: Duration::from_millis(200),
            chunk_size: 512,
            chunk_overlap: 100,
            top_k_results: 5,
        }
    }
}

impl ExtractionConfig {
    /// Set the extraction mode.
    pub fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the per-entity fact cap.
    pub fn with_max_facts_per_entity(mut self, max: usize) -> Self {
        self.max_facts_per_entity = max;
        self
    }

    /// Enable or disable the regex fact-rule fallback.
    pub fn with_rules_fallback(mut self, enabled: bool) -> Self {
        self.rules_fallback = enabled;
        self
    }

    /// Enable or disable model-driven fact extraction.
    pub fn with_llm_facts(mut self, enabled: bool) -> Self {
        self.use_llm_facts = enabled;
        self
    }

    /// Set the classification timeout.
    pub fn with_classify_timeout(mut self, timeout: Duration) -> Self {
        self.classify_timeout = timeout;
        self
    }

    /// Set the fact-extraction timeout.
    pub fn with_fact_timeout(mut self, timeout: Duration) -> Self {
        self.fact_timeout = timeout;
        self
    }
}
