//! Entity and fact extraction.
//!
//! Submodules, leaf-first: [`names`] and [`sentence`] hold text utilities,
//! [`span`] and [`patterns`] generate candidates, [`resolver`] merges them
//! into canonical entities, [`classifier`] validates candidates through the
//! language model, and [`facts`] attaches sentence-scoped facts. [`pipeline`]
//! wires the stages together.

pub mod classifier;
pub mod entity;
pub mod facts;
pub mod json_repair;
pub mod names;
pub mod patterns;
pub mod pipeline;
pub mod resolver;
pub mod rules;
pub mod sentence;
pub mod span;

pub use classifier::EntityTypeClassifier;
pub use entity::{Entity, EntityType, Evidence, Fact, FactMethod};
pub use facts::FactExtractor;
pub use pipeline::ExtractionPipeline;
pub use resolver::EntityResolver;
pub use sentence::{PunctuationSplitter, Sentence, SentenceSplitter};
pub use span::{HeuristicSpanExtractor, RawSpan, SpanExtractor, SpanOrigin};
