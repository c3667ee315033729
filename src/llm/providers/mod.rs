//! LLM provider implementations beyond the LiteLLM client.

pub mod openrouter;

pub use openrouter::OpenRouterProvider;

pub use super::litellm::LlmProvider;
