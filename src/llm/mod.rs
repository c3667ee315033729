//! LLM integration for icp-journal.
//!
//! The report pipeline only depends on the [`LlmProvider`] trait: one request
//! in, one response or [`LlmError`](crate::error::LlmError) out. Two
//! OpenAI-compatible implementations are provided:
//!
//! - [`LiteLlmClient`] for a LiteLLM proxy (or any compatible endpoint)
//! - [`OpenRouterProvider`] for OpenRouter, with retry on transient failures
//!
//! ```ignore
//! use icp_journal::llm::{GenerationRequest, LlmProvider, Message, OpenRouterProvider};
//!
//! let provider = OpenRouterProvider::with_model(api_key, "openai/gpt-4o".to_string())?;
//! let request = GenerationRequest::new("", vec![Message::user("Summarize this table")]);
//! let response = provider.generate(request).await?;
//! ```

pub mod litellm;
pub mod providers;
mod wire;

pub use litellm::{
    ChatRole, Choice, GenerationRequest, GenerationResponse, LiteLlmClient, LlmProvider, Message,
    Usage,
};
pub use providers::OpenRouterProvider;
