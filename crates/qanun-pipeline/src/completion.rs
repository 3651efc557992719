//! Completion client trait and implementations.
//!
//! - `OpenAiClient` talks to any OpenAI-compatible `chat/completions`
//!   endpoint over HTTPS. This is the production backend.
//! - `MockCompletion` replays scripted replies for testing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// One role-tagged message in a completion prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A single completion call: model, prompt, and sampling parameters.
///
/// Serializes directly into the OpenAI wire format. `temperature` and
/// `max_tokens` are omitted from the request body when unset so the
/// endpoint applies its own defaults.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionChoiceMessage {
    content: String,
}

/// Language-model completion endpoint.
///
/// Every stage that talks to a model goes through this trait, so tests can
/// substitute [`MockCompletion`] and the endpoint can be swapped without
/// touching the pipeline.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one completion request and return the first choice's content.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenAiClient - OpenAI-compatible HTTP backend
// ---------------------------------------------------------------------------

/// HTTP client for an OpenAI-compatible `chat/completions` API.
///
/// The base URL is stored without a trailing slash; the `chat/completions`
/// path is appended per call, so the same client works against api.openai.com
/// or any compatible gateway.
pub struct OpenAiClient {
    api_base: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        debug!(model = %request.model, messages = request.messages.len(), "Sending completion request");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Completion(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Completion(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(format!("could not parse body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::InvalidResponse("completion returned no choices".to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockCompletion - scripted replies for testing
// ---------------------------------------------------------------------------

/// Mock completion client that replays a scripted sequence of outcomes.
///
/// Replies are consumed in call order; once the script runs out every call
/// fails. Requests are recorded so tests can assert on prompts, models, and
/// sampling parameters.
#[derive(Default)]
pub struct MockCompletion {
    script: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, content: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(content.into()));
    }

    /// Queue a failing call.
    pub fn push_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(PipelineError::Completion(message.into())));
    }

    /// All requests seen so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for MockCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PipelineError::Completion("mock script exhausted".to_string())))
    }
}

// =============================================================================
// Tests
// =============================================================================
