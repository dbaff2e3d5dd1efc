// Generation module - the asynchronous completion backends
//
// GenerationService is the single seam between the session state machine and
// whatever actually produces text. One external call per invocation, no
// retries at this layer, and no cancellation path (in-flight calls run to
// completion or failure). The service never touches session state; the store
// reconciles the outcome when it arrives back through the event channel.

use crate::session::SamplingParameters;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Errors from a generation call
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not parse backend response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Transport(err.to_string())
    }
}

/// Produces a completion for a prompt against a model
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        params: SamplingParameters,
    ) -> Result<String, GenerationError>;
}

/// Mock backend - the default when no API endpoint is configured
///
/// Echoes the model and prompt after a configurable delay, which is enough
/// to exercise the whole submit/in-flight/resolve cycle from the TUI.
pub struct MockGeneration {
    pub latency: Duration,
}

impl Default for MockGeneration {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(1500),
        }
    }
}

#[async_trait]
impl GenerationService for MockGeneration {
    async fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        _params: SamplingParameters,
    ) -> Result<String, GenerationError> {
        sleep(self.latency).await;
        Ok(format!(
            "This is a mock response from {}. In a real implementation, this would call the actual AI model API.\n\nYour prompt was: \"{}\"",
            model_id, prompt
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible HTTP backend
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for POST /v1/chat/completions
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// The subset of the chat completions response we care about
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// HTTP backend speaking the OpenAI chat completions protocol
///
/// Works against any compatible endpoint (OpenAI itself, a local Ollama or
/// vLLM server, a gateway). The concrete protocol is this collaborator's
/// business; the session store only sees Result<String, GenerationError>.
pub struct HttpGeneration {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpGeneration {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl GenerationService for HttpGeneration {
    async fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        params: SamplingParameters,
    ) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
        };

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            // Keep the body; backends put the useful diagnostics there
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("response had no choices".into()))
    }
}
