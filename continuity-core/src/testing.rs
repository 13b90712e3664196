//! Test doubles for the completion and span-extraction boundaries.
//!
//! These are exported so integration tests and downstream crates can drive
//! the pipeline without a model server.

use crate::error::{ExtractionError, ExtractionResult};
use crate::extraction::span::{RawSpan, SpanExtractor};
use async_trait::async_trait;
use slm::{CompletionError, CompletionResult, CompletionService, GenerationParams};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Completion service that replays a fixed script of responses.
///
/// Responses are consumed front to back; once the script is exhausted,
/// every further call returns an empty string. Prompts and reset calls are
/// recorded for assertions.
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    resets: AtomicUsize,
}

impl ScriptedCompletion {
    /// Create a scripted service from a list of responses.
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            resets: AtomicUsize::new(0),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of reset calls received.
    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn next_response(&self, prompt: &str) -> String {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn generate(&self, prompt: &str, _: &GenerationParams) -> CompletionResult<String> {
        Ok(self.next_response(prompt))
    }

    async fn generate_json(&self, prompt: &str, _: &GenerationParams) -> CompletionResult<String> {
        Ok(self.next_response(prompt))
    }

    async fn reset(&self) -> CompletionResult<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health(&self) -> bool {
        true
    }
}

/// Completion service whose every generation call fails.
pub struct FailingCompletion;

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn generate(&self, _: &str, _: &GenerationParams) -> CompletionResult<String> {
        Err(CompletionError::Unavailable("scripted failure".to_string()))
    }

    async fn generate_json(&self, _: &str, _: &GenerationParams) -> CompletionResult<String> {
        Err(CompletionError::Unavailable("scripted failure".to_string()))
    }

    async fn reset(&self) -> CompletionResult<()> {
        Ok(())
    }

    async fn health(&self) -> bool {
        false
    }
}

/// Completion service that never answers within any reasonable deadline.
pub struct StalledCompletion;

#[async_trait]
impl CompletionService for StalledCompletion {
    async fn generate(&self, _: &str, _: &GenerationParams) -> CompletionResult<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    async fn generate_json(&self, _: &str, _: &GenerationParams) -> CompletionResult<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    async fn reset(&self) -> CompletionResult<()> {
        Ok(())
    }

    async fn health(&self) -> bool {
        false
    }
}

/// Span extractor returning a fixed list of spans.
pub struct StaticSpans(pub Vec<RawSpan>);

#[async_trait]
impl SpanExtractor for StaticSpans {
    async fn extract(&self, _: &str) -> ExtractionResult<Vec<RawSpan>> {
        Ok(self.0.clone())
    }
}

/// Span extractor whose every call fails.
pub struct FailingSpans;

#[async_trait]
impl SpanExtractor for FailingSpans {
    async fn extract(&self, _: &str) -> ExtractionResult<Vec<RawSpan>> {
        Err(ExtractionError::ModelUnavailable(
            "scripted failure".to_string(),
        ))
    }
}
