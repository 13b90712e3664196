//! Story entity memory: entity resolution and fact attachment over
//! narrative text.
//!
//! The core pipeline turns raw story text into canonical entity records
//! with attached, provenance-carrying facts:
//!
//! 1. A span extractor (token-classification model or heuristic) proposes
//!    candidate mentions.
//! 2. The resolver filters, merges, and consolidates candidates into
//!    entities.
//! 3. In slm-only mode, the language model classifies each candidate's
//!    type; in hybrid mode, story-pattern rules add narrative entities the
//!    model misses.
//! 4. The fact extractor asks the model for facts one mention sentence at
//!    a time and tolerantly recovers structured output.
//!
//! The language-model runtime is consumed through the [`slm`] crate's
//! `CompletionService` trait; vector search is a black box behind
//! [`rag::SimilaritySearch`].
//!
//! ```no_run
//! use continuity_core::{ExtractionConfig, ExtractionPipeline, HeuristicSpanExtractor};
//! use slm::{GatedCompletion, LlamaServerClient};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let completion = Arc::new(GatedCompletion::new(LlamaServerClient::from_env()?));
//! let pipeline = ExtractionPipeline::new(
//!     Arc::new(HeuristicSpanExtractor::default()),
//!     completion,
//!     ExtractionConfig::default(),
//! );
//! let entities = pipeline.extract("Elena said the harbor was safe.", "t_001").await;
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod config;
pub mod error;
pub mod extraction;
pub mod rag;
pub mod testing;

pub use chunker::{Chunk, TextChunker};
pub use config::{ExtractionConfig, ExtractionMode};
pub use error::{ExtractionError, ExtractionResult};
pub use extraction::{
    Entity, EntityResolver, EntityType, EntityTypeClassifier, Evidence, ExtractionPipeline, Fact,
    FactExtractor, FactMethod, HeuristicSpanExtractor, PunctuationSplitter, RawSpan, Sentence,
    SentenceSplitter, SpanExtractor, SpanOrigin,
};
pub use rag::{ChatMessage, PromptBuilder, RagPipeline, ScoredDocument, SimilaritySearch};
