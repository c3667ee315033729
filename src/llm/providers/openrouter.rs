//! OpenRouter provider.
//!
//! One OpenAI-compatible endpoint in front of many model vendors. Network
//! errors, 5xx and 429 replies are retried with exponential backoff; anything
//! else goes straight back to the agent.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::LlmError;
use crate::llm::wire::{build_http_client, send_chat_completion, ApiRequest};
use crate::llm::{GenerationRequest, GenerationResponse, LlmProvider};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Model used when neither the request nor the CLI names one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

const DEFAULT_ATTEMPTS: u32 = 3;
const BASE_RETRY_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Text generation through OpenRouter.
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    max_attempts: u32,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("api_key", &mask_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl OpenRouterProvider {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Self::with_model(api_key, DEFAULT_MODEL.to_string())
    }

    /// `model` is an OpenRouter id such as `anthropic/claude-3.5-sonnet`.
    pub fn with_model(api_key: String, model: String) -> Result<Self, LlmError> {
        Self::with_custom_url(api_key, OPENROUTER_BASE_URL.to_string(), model)
    }

    /// Points the provider at an OpenRouter-compatible proxy.
    ///
    /// # Errors
    ///
    /// `LlmError::MissingApiKey` for a blank key.
    pub fn with_custom_url(
        api_key: String,
        base_url: String,
        model: String,
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        Ok(Self {
            client: build_http_client(Duration::from_secs(REQUEST_TIMEOUT_SECS))?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model: model,
            max_attempts: DEFAULT_ATTEMPTS,
        })
    }

    /// Total attempts per request, including the first; at least one.
    pub fn with_max_retries(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn send_with_retry(
        &self,
        body: &ApiRequest<'_>,
    ) -> Result<GenerationResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut attempt = 1;

        loop {
            let err = match send_chat_completion(&self.client, &url, Some(&self.api_key), body)
                .await
            {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if attempt >= self.max_attempts || !is_transient_error(&err) {
                return Err(err);
            }

            let delay = retry_delay(attempt);
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "OpenRouter request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Backoff before the attempt following `attempt`: 1s, 2s, 4s, ...
fn retry_delay(attempt: u32) -> Duration {
    BASE_RETRY_DELAY * 2u32.saturating_pow(attempt.saturating_sub(1))
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Whether another attempt could succeed.
fn is_transient_error(error: &LlmError) -> bool {
    match error {
        LlmError::RateLimited(_) => true,
        LlmError::ApiError { code, .. } => *code == 429 || *code >= 500,
        LlmError::RequestFailed(msg) => {
            let msg = msg.to_lowercase();
            ["timeout", "timed out", "connection", "temporarily"]
                .iter()
                .any(|needle| msg.contains(needle))
        }
        _ => false,
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let body = request.to_api_request(&self.default_model);
        tracing::debug!(model = body.model, "Sending OpenRouter request");
        self.send_with_retry(&body).await
    }
}
