//! Analyst agent: the text-generation capability used by the report pipeline.
//!
//! [`AnalystAgent::generate`] takes a persona, an instruction and optional
//! context, sends a single request through an [`LlmProvider`], and returns the
//! reply text. Every call is bounded by the configured timeout, and blank
//! replies are rejected so that callers never assemble a document from
//! empty sections.

use std::sync::Arc;
use std::time::Duration;

use crate::llm::{GenerationRequest, LlmProvider, Message};

use super::error::{AgentResult, GenerationError};
use super::persona::AgentPersona;

/// Configuration for the analyst agent.
#[derive(Debug, Clone)]
pub struct AnalystAgentConfig {
    /// Model identifier; empty uses the provider default.
    pub model: String,
    /// Temperature for LLM generation.
    pub temperature: f64,
    /// Maximum tokens for LLM response.
    pub max_tokens: u32,
    /// Upper bound on a single generate call.
    pub timeout: Duration,
}

impl Default for AnalystAgentConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout: Duration::from_secs(120),
        }
    }
}

impl AnalystAgentConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Agent that turns persona + instruction into free-form text.
pub struct AnalystAgent {
    llm_client: Arc<dyn LlmProvider>,
    config: AnalystAgentConfig,
}

impl std::fmt::Debug for AnalystAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalystAgent")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AnalystAgent {
    pub fn new(llm_client: Arc<dyn LlmProvider>, config: AnalystAgentConfig) -> Self {
        Self { llm_client, config }
    }

    pub fn with_defaults(llm_client: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm_client, AnalystAgentConfig::default())
    }

    pub fn config(&self) -> &AnalystAgentConfig {
        &self.config
    }

    /// Generates text for `instruction` in the voice of `persona`.
    ///
    /// `context` is appended after the instruction when non-empty.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::Timeout`] when no reply arrives in time
    /// - [`GenerationError::EmptyResponse`] when the reply is blank
    /// - the mapped provider error otherwise
    pub async fn generate(
        &self,
        persona: &AgentPersona,
        instruction: &str,
        context: &str,
    ) -> AgentResult<String> {
        let request = self.build_request(persona, instruction, context);
        let timeout = self.config.timeout;

        let response = tokio::time::timeout(timeout, self.llm_client.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout { timeout })??;

        let content = response
            .first_content()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        tracing::debug!(
            role = %persona.role,
            completion_tokens = response.usage.completion_tokens,
            chars = content.len(),
            "Agent produced text"
        );

        Ok(content.to_string())
    }

    fn build_request(
        &self,
        persona: &AgentPersona,
        instruction: &str,
        context: &str,
    ) -> GenerationRequest {
        let user_prompt = if context.trim().is_empty() {
            instruction.to_string()
        } else {
            format!("{}\n\n{}", instruction, context)
        };

        GenerationRequest::new(
            self.config.model.clone(),
            vec![
                Message::system(persona.system_prompt()),
                Message::user(user_prompt),
            ],
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationResponse, Usage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock LLM provider that replies with a fixed text after an optional delay.
    struct MockLlmProvider {
        response: String,
        delay: Duration,
        last_request: Mutex<Option<GenerationRequest>>,
    }

    impl MockLlmProvider {
        fn new(response: impl Into<String>) -> Self {
            Self {
                response: response.into(),
                delay: Duration::ZERO,
                last_request: Mutex::new(None),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            *self.last_request.lock().expect("lock not poisoned") = Some(request);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(GenerationResponse {
                id: "mock-id".to_string(),
                model: "mock-model".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(self.response.clone()),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage::default(),
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            Err(LlmError::RateLimited("quota exhausted".to_string()))
        }
    }

    #[tokio::test]
    async fn test_generate_returns_trimmed_text() {
        let provider = Arc::new(MockLlmProvider::new("  # Key Insights\nPro plans dominate.\n"));
        let agent = AnalystAgent::with_defaults(provider);

        let text = agent
            .generate(&AgentPersona::insights_analyst(), "Analyze", "")
            .await
            .expect("generation should succeed");

        assert_eq!(text, "# Key Insights\nPro plans dominate.");
    }

    #[tokio::test]
    async fn test_request_carries_persona_and_context() {
        let provider = Arc::new(MockLlmProvider::new("ok"));
        let agent = AnalystAgent::new(
            provider.clone(),
            AnalystAgentConfig::default().with_model("test-model"),
        );

        agent
            .generate(&AgentPersona::strategist(), "Suggest steps", "Expected output: a list")
            .await
            .expect("generation should succeed");

        let request = provider
            .last_request
            .lock()
            .expect("lock not poisoned")
            .clone()
            .expect("request recorded");
        assert_eq!(request.model, "test-model");
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.messages[0].content.contains("Data Strategist"));
        assert_eq!(
            request.messages[1].content,
            "Suggest steps\n\nExpected output: a list"
        );
    }

    #[tokio::test]
    async fn test_blank_reply_is_empty_response() {
        let provider = Arc::new(MockLlmProvider::new(" \n\t "));
        let agent = AnalystAgent::with_defaults(provider);

        let err = agent
            .generate(&AgentPersona::quality_auditor(), "Audit", "")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let provider =
            Arc::new(MockLlmProvider::new("late").with_delay(Duration::from_millis(500)));
        let agent = AnalystAgent::new(
            provider,
            AnalystAgentConfig::default().with_timeout(Duration::from_millis(20)),
        );

        let err = agent
            .generate(&AgentPersona::insights_analyst(), "Analyze", "")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Timeout { timeout } if timeout == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_provider_error_is_mapped() {
        let agent = AnalystAgent::with_defaults(Arc::new(FailingProvider));

        let err = agent
            .generate(&AgentPersona::insights_analyst(), "Analyze", "")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::RateLimited(_)));
    }
}
