//! Single-agent analyst journal.
//!
//! Renders the metrics summary as a findings block and asks the business
//! analyst persona for a structured journal ending in an Ideal Customer
//! Profile summary.

use std::sync::Arc;

use crate::agents::{AgentPersona, AgentResult, AnalystAgent};
use crate::llm::LlmProvider;
use crate::report::metrics::{keys, MetricsSummary};

use super::config::ReportConfig;

const UNKNOWN: &str = "Unknown";

const JOURNAL_INSTRUCTION: &str = "Using the dataset findings below, write a professional \
Business Analyst Journal that includes:

- Subscription Plans Insights
- Financial Insights (Average Spend and Churn Rate)
- Customer Tenure Insights
- Geographic Distribution Insights
- Signup Source Insights
- Industry Distribution Insights
- A Final Strategic Ideal Customer Profile (ICP) Summary:
    - Ideal country
    - Ideal plan
    - Ideal industry
    - Spending behavior
    - Strategic recommendations

The writing should be formal, structured, and bullet-pointed when appropriate.";

const JOURNAL_EXPECTED_OUTPUT: &str = "Expected output: A structured business analysis text \
covering all the requested sections, suitable for C-Level review.";

/// Writes the analyst journal for a metrics summary.
#[derive(Debug)]
pub struct JournalWriter {
    agent: AnalystAgent,
    persona: AgentPersona,
}

impl JournalWriter {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &ReportConfig) -> Self {
        Self {
            agent: AnalystAgent::new(provider, config.agent_config()),
            persona: AgentPersona::business_analyst(),
        }
    }

    /// Generates the journal text.
    ///
    /// # Errors
    ///
    /// Any [`GenerationError`](crate::agents::GenerationError) from the agent.
    pub async fn write(&self, metrics: &MetricsSummary) -> AgentResult<String> {
        let instruction = format!(
            "{}\n\nDataset findings:\n\n{}",
            JOURNAL_INSTRUCTION,
            findings_text(metrics)
        );

        tracing::info!(metrics = metrics.len(), "Writing analyst journal");
        self.agent
            .generate(&self.persona, &instruction, JOURNAL_EXPECTED_OUTPUT)
            .await
    }
}

/// Renders the findings block handed to the journal writer.
///
/// Missing metrics render as `Unknown`.
pub fn findings_text(metrics: &MetricsSummary) -> String {
    let display = |key: &str| {
        metrics
            .get(key)
            .map(|v| v.to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    let tenure = metrics
        .scalar(keys::TENURE_MEAN)
        .map(|t| format!("{} months", t))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let entries = [
        ("Plan Distribution", display(keys::PLAN_DISTRIBUTION)),
        ("Average Spend", display(keys::MONTHLY_SPEND_MEAN)),
        ("Churn Rate", display(keys::CHURN_RATE)),
        ("Average Tenure", tenure),
        ("Top Countries", display(keys::TOP_COUNTRIES)),
        ("Top Industries", display(keys::TOP_INDUSTRIES)),
        ("Signup Sources", display(keys::TOP_SIGNUP_SOURCES)),
    ];

    entries
        .iter()
        .map(|(label, value)| format!("{}:\n{}", label, value))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, Message, Usage};
    use crate::report::metrics::{CategoryShare, MetricValue};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockLlmProvider {
        last_request: Mutex<Option<GenerationRequest>>,
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            *self.last_request.lock().expect("lock not poisoned") = Some(request);
            Ok(GenerationResponse {
                id: "mock".to_string(),
                model: "mock".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant("# Business Analyst Journal\n- ICP: Pro, US"),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage::default(),
            })
        }
    }

    fn summary() -> MetricsSummary {
        let mut m = MetricsSummary::new();
        m.insert(
            keys::PLAN_DISTRIBUTION,
            MetricValue::Distribution(vec![
                CategoryShare {
                    category: "Pro".to_string(),
                    share: "60.0%".to_string(),
                },
                CategoryShare {
                    category: "Basic".to_string(),
                    share: "40.0%".to_string(),
                },
            ]),
        );
        m.insert(keys::TENURE_MEAN, MetricValue::Scalar("14.2".to_string()));
        m.insert(
            keys::TOP_COUNTRIES,
            MetricValue::List(vec!["US".to_string(), "UK".to_string()]),
        );
        m
    }

    #[test]
    fn test_findings_fill_unknowns() {
        let text = findings_text(&summary());

        assert!(text.contains("Plan Distribution:\nPro 60.0%, Basic 40.0%"));
        assert!(text.contains("Average Tenure:\n14.2 months"));
        assert!(text.contains("Top Countries:\nUS, UK"));
        assert!(text.contains("Churn Rate:\nUnknown"));
        assert!(text.contains("Average Spend:\nUnknown"));
        assert!(text.contains("Signup Sources:\nUnknown"));
    }

    #[test]
    fn test_empty_list_renders_unknown() {
        let mut m = MetricsSummary::new();
        m.insert(keys::TOP_INDUSTRIES, MetricValue::List(Vec::new()));
        assert!(findings_text(&m).contains("Top Industries:\nUnknown"));
    }

    #[tokio::test]
    async fn test_write_uses_business_analyst_persona() {
        let provider = Arc::new(MockLlmProvider {
            last_request: Mutex::new(None),
        });
        let writer = JournalWriter::new(provider.clone(), &ReportConfig::default());

        let journal = writer.write(&summary()).await.expect("journal written");
        assert!(journal.starts_with("# Business Analyst Journal"));

        let request = provider
            .last_request
            .lock()
            .expect("lock not poisoned")
            .clone()
            .expect("request recorded");
        assert!(request.messages[0].content.contains("Business Analyst"));
        assert!(request.messages[1].content.contains("Ideal Customer Profile"));
        assert!(request.messages[1].content.contains("Pro 60.0%"));
        assert!(request.messages[1].content.contains("C-Level review"));
    }
}
