//! Error types for the extraction core.
//!
//! Uses thiserror for ergonomic error definition. Per-unit failures (one
//! candidate, one sentence) are recovered locally and never surface through
//! these types; extraction functions only raise for whole-call setup
//! failures.

use slm::CompletionError;
use std::time::Duration;

/// Errors that can occur during entity and fact extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The completion or span-extraction service cannot be reached.
    /// Fatal at startup; not retried by the core.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// A single completion call exceeded its timeout.
    #[error("Generation timed out after {duration:?}")]
    GenerationTimeout { duration: Duration },

    /// Completion output was not valid JSON even after tolerant recovery.
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// A candidate failed type classification or validation.
    #[error("Candidate rejected by validation: {candidate}")]
    ValidationRejected { candidate: String },

    /// The span-extraction model failed.
    #[error("Span extraction failed: {0}")]
    SpanExtraction(String),

    /// Error from the completion service.
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for extraction operations.
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;
