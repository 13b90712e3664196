//! Minimal client for a local llama.cpp-style completion server.
//!
//! This crate provides the text-completion boundary used by the extraction
//! core:
//! - A [`CompletionService`] trait for plain and JSON-constrained generation
//! - [`LlamaServerClient`], an HTTP client for a llama.cpp `/completion` server
//! - [`GatedCompletion`], a serialization gate guaranteeing at most one
//!   in-flight generation with state resets around every call
//!
//! The underlying generation runtime is not safe for concurrent invocation
//! and retains KV-cache state between calls, so callers should always go
//! through [`GatedCompletion`] rather than hitting the raw client from
//! multiple tasks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// Default stop sequences preventing run-on generation.
const DEFAULT_STOP: &[&str] = &["</s>", "User:", "\n\n"];

/// Errors that can occur when talking to the completion server.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion server unavailable: {0}")]
    Unavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse server response: {0}")]
    Parse(String),

    #[error("Generation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

/// Result type for completion operations.
pub type CompletionResult<T> = std::result::Result<T, CompletionError>;

/// Decoding parameters for a single generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature (0.0 - 1.0).
    pub temperature: f32,
    /// Top-p nucleus sampling.
    pub top_p: f32,
    /// Maximum tokens to generate.
    pub max_tokens: usize,
    /// Stop sequences that terminate generation.
    pub stop: Vec<String>,
    /// Deadline for the whole call; enforced by [`GatedCompletion`].
    pub timeout: Duration,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 256,
            stop: DEFAULT_STOP.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl GenerationParams {
    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    /// Set the token budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the stop sequences.
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A text-completion service.
///
/// `generate_json` carries the caller's intent that the output should be a
/// JSON object, but the return value is still raw text: local models are
/// unreliable and the caller is expected to run tolerant recovery over it.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate a completion for the prompt.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> CompletionResult<String>;

    /// Generate a completion expected to contain a JSON object.
    async fn generate_json(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> CompletionResult<String>;

    /// Reset any retained generation state (KV cache, slots).
    async fn reset(&self) -> CompletionResult<()>;

    /// Check whether the server is reachable and can generate.
    async fn health(&self) -> bool;
}

/// HTTP client for a llama.cpp `/completion` server.
#[derive(Clone)]
pub struct LlamaServerClient {
    client: reqwest::Client,
    base_url: String,
}

impl LlamaServerClient {
    /// Create a new client for the given server base URL.
    pub fn new(base_url: impl Into<String>) -> CompletionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CompletionError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the SLM_SERVER_URL environment variable,
    /// falling back to the default local address.
    pub fn from_env() -> CompletionResult<Self> {
        let url =
            std::env::var("SLM_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        Self::new(url)
    }

    async fn post_completion(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> CompletionResult<String> {
        let request = ApiCompletionRequest {
            prompt,
            temperature: params.temperature,
            top_p: params.top_p,
            n_predict: params.max_tokens,
            stop: &params.stop,
            cache_prompt: false,
        };

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        Ok(api_response.content.trim().to_string())
    }
}

#[async_trait]
impl CompletionService for LlamaServerClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> CompletionResult<String> {
        self.post_completion(prompt, params).await
    }

    async fn generate_json(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> CompletionResult<String> {
        // Same endpoint; the prompt carries the JSON-only instruction and the
        // caller runs tolerant recovery over whatever comes back.
        self.post_completion(prompt, params).await
    }

    async fn reset(&self) -> CompletionResult<()> {
        // Erase slot 0's KV cache. Older servers lack the endpoint; a 404
        // means there is no retained state to clear.
        let response = self
            .client
            .post(format!("{}/slots/0?action=erase", self.base_url))
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status.as_u16() == 404 {
            Ok(())
        } else {
            Err(CompletionError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn health(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Serialization gate around a completion service.
///
/// The generation runtime's internal state is exclusively owned by whichever
/// call currently holds the gate. The gate resets that state on acquire and
/// again on error or timeout release, so unrelated prompts never see each
/// other's context.
pub struct GatedCompletion<S: CompletionService> {
    inner: S,
    gate: Mutex<()>,
}

impl<S: CompletionService> GatedCompletion<S> {
    /// Wrap a completion service in a serialization gate.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            gate: Mutex::new(()),
        }
    }

    async fn run_gated<'a, F, Fut>(
        &'a self,
        prompt: &'a str,
        params: &'a GenerationParams,
        call: F,
    ) -> CompletionResult<String>
    where
        F: FnOnce(&'a S, &'a str, &'a GenerationParams) -> Fut,
        Fut: std::future::Future<Output = CompletionResult<String>> + Send + 'a,
    {
        let _guard = self.gate.lock().await;

        // Fresh state for every call; a failed reset is not fatal.
        if let Err(e) = self.inner.reset().await {
            tracing::warn!(error = %e, "state reset before generation failed");
        }

        match tokio::time::timeout(params.timeout, call(&self.inner, prompt, params)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                if let Err(reset_err) = self.inner.reset().await {
                    tracing::warn!(error = %reset_err, "state reset after failure failed");
                }
                Err(e)
            }
            Err(_) => {
                tracing::warn!(timeout = ?params.timeout, "generation timed out");
                if let Err(reset_err) = self.inner.reset().await {
                    tracing::warn!(error = %reset_err, "state reset after timeout failed");
                }
                Err(CompletionError::Timeout {
                    duration: params.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl<S: CompletionService> CompletionService for GatedCompletion<S> {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> CompletionResult<String> {
        self.run_gated(prompt, params, |inner, p, gp| inner.generate(p, gp))
            .await
    }

    async fn generate_json(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> CompletionResult<String> {
        self.run_gated(prompt, params, |inner, p, gp| inner.generate_json(p, gp))
            .await
    }

    async fn reset(&self) -> CompletionResult<()> {
        let _guard = self.gate.lock().await;
        self.inner.reset().await
    }

    async fn health(&self) -> bool {
        let _guard = self.gate.lock().await;
        self.inner.health().await
    }
}

// API request/response types for the llama.cpp server.

#[derive(Debug, Serialize)]
struct ApiCompletionRequest<'a> {
    prompt: &'a str,
    temperature: f32,
    top_p: f32,
    n_predict: usize,
    stop: &'a [String],
    cache_prompt: bool,
}

#[derive(Debug, Deserialize)]
struct ApiCompletionResponse {
    content: String,
}
