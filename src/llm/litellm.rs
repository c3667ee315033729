//! Chat types, the [`LlmProvider`] seam, and the LiteLLM proxy client.
//!
//! Agents build a [`GenerationRequest`] from a persona and a prompt; any
//! provider turns it into a [`GenerationResponse`]. [`LiteLlmClient`] talks to
//! a LiteLLM proxy or any other OpenAI-compatible `/chat/completions` route.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use super::wire::{build_http_client, send_chat_completion, ApiRequest};
use crate::error::LlmError;

const HTTP_TIMEOUT_SECS: u64 = 120;

/// Used when `LITELLM_DEFAULT_MODEL` is unset.
const DEFAULT_LITELLM_MODEL: &str = "gpt-4o";

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    /// Roles this crate never sends (`tool`, `function`, ...).
    #[serde(other)]
    Other,
}

/// One turn of a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: ChatRole,
    pub content: String,
}

impl Message {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Persona framing for the agent.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Instruction plus the table or findings it refers to.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// A single completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Empty selects the provider's default model.
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Model to put on the wire, falling back to `default_model`.
    pub fn resolved_model<'a>(&'a self, default_model: &'a str) -> &'a str {
        if self.model.trim().is_empty() {
            default_model
        } else {
            &self.model
        }
    }

    pub(crate) fn to_api_request<'a>(&'a self, default_model: &'a str) -> ApiRequest<'a> {
        ApiRequest {
            model: self.resolved_model(default_model),
            messages: &self.messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// What a provider sent back for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

impl GenerationResponse {
    /// Text of the first choice; agents only ever ask for one.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    /// `stop`, `length`, ...
    pub finish_reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Anything that can complete a chat request.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

/// Client for a LiteLLM proxy.
pub struct LiteLlmClient {
    api_base: String,
    api_key: Option<String>,
    default_model: String,
    http_client: Client,
}

impl std::fmt::Debug for LiteLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiteLlmClient")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl LiteLlmClient {
    /// `api_base` is the proxy root, e.g. `http://localhost:4000`; a trailing
    /// slash is dropped.
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        default_model: String,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            default_model,
            http_client: build_http_client(Duration::from_secs(HTTP_TIMEOUT_SECS))?,
        })
    }

    /// Reads `LITELLM_API_BASE` (required), `LITELLM_API_KEY` and
    /// `LITELLM_DEFAULT_MODEL`.
    ///
    /// # Errors
    ///
    /// `LlmError::MissingApiBase` when `LITELLM_API_BASE` is unset.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_base = env::var("LITELLM_API_BASE").map_err(|_| LlmError::MissingApiBase)?;
        let default_model = env::var("LITELLM_DEFAULT_MODEL")
            .unwrap_or_else(|_| DEFAULT_LITELLM_MODEL.to_string());
        Self::new(api_base, env::var("LITELLM_API_KEY").ok(), default_model)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl LlmProvider for LiteLlmClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let body = request.to_api_request(&self.default_model);
        let url = self.completions_url();
        tracing::debug!(model = body.model, url = %url, "Sending LiteLLM request");

        send_chat_completion(&self.http_client, &url, self.api_key.as_deref(), &body).await
    }
}
