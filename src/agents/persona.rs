//! Role personas for the generation agents.
//!
//! A persona is the role / goal / backstory triple that frames every request
//! an agent sends. The four built-in personas cover the three analysis tasks
//! and the single-agent journal writer.

use serde::Serialize;

/// Role description handed to the text generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentPersona {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl AgentPersona {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    /// Finds patterns and trends in the customer sample.
    pub fn insights_analyst() -> Self {
        Self::new(
            "Data Insights Analyst",
            "Discover key patterns and insights from the dataset.",
            "An experienced data analyst specializing in uncovering trends and business patterns.",
        )
    }

    /// Audits the sample for missing values and inconsistencies.
    pub fn quality_auditor() -> Self {
        Self::new(
            "Data Quality Auditor",
            "Identify missing values, inconsistencies, and potential data quality issues.",
            "Expert at ensuring data integrity and validation for business reliability.",
        )
    }

    /// Turns the data into next steps.
    pub fn strategist() -> Self {
        Self::new(
            "Data Strategist",
            "Propose actionable improvements and next steps based on the data insights.",
            "A strategist who translates data into meaningful business actions and improvements.",
        )
    }

    /// Writes the journal from extracted findings.
    pub fn business_analyst() -> Self {
        Self::new(
            "Business Analyst",
            "Analyze business data insights and generate a strategic professional report.",
            "An experienced business intelligence analyst who specializes in interpreting \
             subscription models, churn behaviors, customer demographics, and financial \
             patterns, and translating them into actionable strategic insights.",
        )
    }

    /// Renders the persona as a system prompt.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are a {}.\nYour goal: {}\nBackground: {}\n\
             Answer in plain Markdown. Do not ask follow-up questions.",
            self.role, self.goal, self.backstory
        )
    }
}
