//! Retrieval-augmented generation over the indexed story text.
//!
//! The vector store is a black box behind [`SimilaritySearch`]; this module
//! only wires retrieval into prompt assembly and generation. Retrieval
//! failures degrade to answering without context; generation failures
//! propagate to the caller.

mod prompt;

pub use prompt::PromptBuilder;

use crate::chunker::Chunk;
use crate::error::{ExtractionError, ExtractionResult};
use async_trait::async_trait;
use slm::{CompletionService, GenerationParams};
use std::sync::Arc;
use tracing::{error, info};

/// A retrieved document with its distance score (lower is closer).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    /// Store-assigned document id.
    pub id: String,
    /// Document text.
    pub text: String,
    /// Distance in [0, 1]; relevance is `1 - score`.
    pub score: f64,
}

/// One message of conversation history.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// "user" or "assistant".
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a message.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Black-box vector search service.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Index a document; returns the store-assigned id.
    async fn store(&self, text: &str, id_hint: &str) -> ExtractionResult<String>;

    /// Return the `top_k` closest documents for a query, best first.
    async fn query(&self, text: &str, top_k: usize) -> ExtractionResult<Vec<ScoredDocument>>;
}

/// Retrieval plus generation over an indexed story.
pub struct RagPipeline {
    search: Arc<dyn SimilaritySearch>,
    completion: Arc<dyn CompletionService>,
    top_k: usize,
}

impl RagPipeline {
    /// Create a pipeline with the given retrieval fan-out.
    pub fn new(
        search: Arc<dyn SimilaritySearch>,
        completion: Arc<dyn CompletionService>,
        top_k: usize,
    ) -> Self {
        Self {
            search,
            completion,
            top_k,
        }
    }

    /// Index chunks into the knowledge base.
    pub async fn add_chunks(&self, chunks: &[Chunk]) -> ExtractionResult<()> {
        for chunk in chunks {
            self.search.store(&chunk.text, &chunk.id).await?;
        }
        info!(count = chunks.len(), "indexed chunks");
        Ok(())
    }

    /// Answer a query with retrieved context and recent history.
    ///
    /// Returns the generated answer and the documents it was grounded on.
    pub async fn query(
        &self,
        user_query: &str,
        history: &[ChatMessage],
        use_context: bool,
    ) -> ExtractionResult<(String, Vec<ScoredDocument>)> {
        let context = if use_context {
            match self.search.query(user_query, self.top_k).await {
                Ok(docs) => {
                    info!(count = docs.len(), "retrieved context documents");
                    docs
                }
                Err(e) => {
                    error!(error = %e, "context retrieval failed, answering without it");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let prompt = PromptBuilder::build_rag_prompt(user_query, &context, history);
        let params = GenerationParams::default();
        let answer = self
            .completion
            .generate(&prompt, &params)
            .await
            .map_err(ExtractionError::from)?;

        Ok((answer, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingCompletion, ScriptedCompletion};
    use std::sync::Mutex;

    struct StaticSearch(Vec<ScoredDocument>);

    #[async_trait]
    impl SimilaritySearch for StaticSearch {
        async fn store(&self, _: &str, id_hint: &str) -> ExtractionResult<String> {
            Ok(id_hint.to_string())
        }

        async fn query(&self, _: &str, top_k: usize) -> ExtractionResult<Vec<ScoredDocument>> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl SimilaritySearch for FailingSearch {
        async fn store(&self, _: &str, _: &str) -> ExtractionResult<String> {
            Err(ExtractionError::ModelUnavailable("store down".to_string()))
        }

        async fn query(&self, _: &str, _: usize) -> ExtractionResult<Vec<ScoredDocument>> {
            Err(ExtractionError::ModelUnavailable("store down".to_string()))
        }
    }

    struct RecordingSearch(Mutex<Vec<String>>);

    #[async_trait]
    impl SimilaritySearch for RecordingSearch {
        async fn store(&self, text: &str, id_hint: &str) -> ExtractionResult<String> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(id_hint.to_string())
        }

        async fn query(&self, _: &str, _: usize) -> ExtractionResult<Vec<ScoredDocument>> {
            Ok(Vec::new())
        }
    }

    fn docs() -> Vec<ScoredDocument> {
        vec![ScoredDocument {
            id: "doc_1".to_string(),
            text: "Elena tends the lighthouse.".to_string(),
            score: 0.2,
        }]
    }

    #[tokio::test]
    async fn test_query_returns_answer_and_sources() {
        let pipeline = RagPipeline::new(
            Arc::new(StaticSearch(docs())),
            Arc::new(ScriptedCompletion::new(["She lives at the lighthouse."])),
            5,
        );

        let (answer, sources) = pipeline.query("Where does Elena live?", &[], true).await.unwrap();
        assert_eq!(answer, "She lives at the lighthouse.");
        assert_eq!(sources.len(), 1);
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_to_no_context() {
        let completion = Arc::new(ScriptedCompletion::new(["answer"]));
        let pipeline = RagPipeline::new(Arc::new(FailingSearch), completion.clone(), 5);

        let (answer, sources) = pipeline.query("q", &[], true).await.unwrap();
        assert_eq!(answer, "answer");
        assert!(sources.is_empty());
        assert!(!completion.prompts()[0].contains("## Context Information:"));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let pipeline = RagPipeline::new(
            Arc::new(StaticSearch(docs())),
            Arc::new(FailingCompletion),
            5,
        );
        assert!(pipeline.query("q", &[], true).await.is_err());
    }

    #[tokio::test]
    async fn test_add_chunks_indexes_every_chunk() {
        let search = Arc::new(RecordingSearch(Mutex::new(Vec::new())));
        let pipeline = RagPipeline::new(
            search.clone(),
            Arc::new(ScriptedCompletion::new(Vec::<String>::new())),
            5,
        );

        let chunks = crate::chunker::TextChunker::new(30, 5)
            .chunk("First sentence here. Second sentence here.", "seg_1");
        pipeline.add_chunks(&chunks).await.unwrap();
        assert_eq!(search.0.lock().unwrap().len(), chunks.len());
    }
}
