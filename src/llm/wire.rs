//! OpenAI-compatible chat completion wire format.
//!
//! Shared by every HTTP client in this module. Only the fields the report
//! pipeline reads are deserialized.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::litellm::{ChatRole, Choice, GenerationResponse, Message, Usage};
use crate::error::LlmError;

/// Builds the HTTP client used for completion requests.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::RequestFailed(format!("Failed to build HTTP client: {}", e)))
}

/// Request body for `POST {base}/chat/completions`, borrowed from a
/// [`GenerationRequest`](super::GenerationRequest) so retries reuse it.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ApiRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    index: u32,
    message: ApiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    role: ChatRole,
    // some providers send `null` content for refusals or tool calls
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Sends one completion request and converts the reply.
pub(crate) async fn send_chat_completion(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
    request: &ApiRequest<'_>,
) -> Result<GenerationResponse, LlmError> {
    let mut http_request = client
        .post(url)
        .header("Content-Type", "application/json")
        .header("HTTP-Referer", "https://icp-journal.local")
        .header("X-Title", "icp-journal");

    if let Some(key) = api_key {
        http_request = http_request.header("Authorization", format!("Bearer {}", key));
    }

    let http_response = http_request
        .json(request)
        .send()
        .await
        .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

    let status = http_response.status();
    if !status.is_success() {
        let error_text = http_response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        return Err(status_error(status.as_u16(), &error_text));
    }

    let body = http_response
        .text()
        .await
        .map_err(|e| LlmError::RequestFailed(e.to_string()))?;
    parse_response_body(&body)
}

/// Maps a non-success HTTP status and body to an [`LlmError`].
pub(crate) fn status_error(status_code: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.to_string());

    if status_code == 429 {
        LlmError::RateLimited(message)
    } else {
        LlmError::ApiError {
            code: status_code,
            message,
        }
    }
}

/// Parses a successful completion body.
pub(crate) fn parse_response_body(body: &str) -> Result<GenerationResponse, LlmError> {
    let api_response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

    let choices = api_response
        .choices
        .into_iter()
        .map(|choice| Choice {
            index: choice.index,
            message: Message {
                role: choice.message.role,
                content: choice.message.content.unwrap_or_default(),
            },
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
        })
        .collect();

    let usage = api_response
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(GenerationResponse {
        id: api_response.id,
        model: api_response.model,
        choices,
        usage,
    })
}
