//! Analysis roles, task objects and document assembly.
//!
//! The pipeline runs one [`AnalysisTask`] per [`AnalysisRole`]. Tasks are
//! independent: each sees the same serialized sample and none reads another's
//! output. Results are stitched into a [`RawDocument`] in role order.

use std::time::Duration;

use serde::Serialize;

use crate::agents::AgentPersona;

/// Placeholder substituted with the serialized sample.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// The three analysis roles, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisRole {
    Insights,
    QualityAudit,
    Recommendations,
}

impl AnalysisRole {
    pub const ALL: [AnalysisRole; 3] = [
        AnalysisRole::Insights,
        AnalysisRole::QualityAudit,
        AnalysisRole::Recommendations,
    ];

    pub fn id(self) -> &'static str {
        match self {
            AnalysisRole::Insights => "insights",
            AnalysisRole::QualityAudit => "quality",
            AnalysisRole::Recommendations => "recommendations",
        }
    }

    pub fn persona(self) -> AgentPersona {
        match self {
            AnalysisRole::Insights => AgentPersona::insights_analyst(),
            AnalysisRole::QualityAudit => AgentPersona::quality_auditor(),
            AnalysisRole::Recommendations => AgentPersona::strategist(),
        }
    }

    /// Instruction with a single [`TABLE_PLACEHOLDER`].
    ///
    /// Each asks for a leading heading so the section router can find it.
    pub fn instruction_template(self) -> &'static str {
        match self {
            AnalysisRole::Insights => {
                "Analyze the following customer dataset and find key patterns, trends, and \
                 interesting insights. Start your answer with the heading '# Key Insights'.\n\n{table}"
            }
            AnalysisRole::QualityAudit => {
                "Audit the following customer dataset and identify any data quality issues like \
                 missing values, duplicates, or inconsistencies. Start your answer with the \
                 heading '# Data Quality Assessment'.\n\n{table}"
            }
            AnalysisRole::Recommendations => {
                "Based on the following customer dataset, suggest improvements, optimizations, and \
                 next actionable steps for better business decisions. Start your answer with the \
                 heading '# Recommendations'.\n\n{table}"
            }
        }
    }

    pub fn expected_output(self) -> &'static str {
        match self {
            AnalysisRole::Insights => {
                "A list of key patterns, trends, and interesting insights discovered in the dataset."
            }
            AnalysisRole::QualityAudit => {
                "A list of detected data quality issues, missing fields, duplicates, or \
                 inconsistencies found in the dataset."
            }
            AnalysisRole::Recommendations => {
                "A list of suggested business improvements and next actionable steps based on \
                 the dataset analysis."
            }
        }
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for AnalysisRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// One role's unit of work.
#[derive(Debug, Clone)]
pub struct AnalysisTask {
    pub role: AnalysisRole,
    pub persona: AgentPersona,
    pub instruction: String,
    pub expected_output: String,
}

impl AnalysisTask {
    /// Builds the task for `role`, interpolating `table` once.
    pub fn new(role: AnalysisRole, table: &str) -> Self {
        Self {
            role,
            persona: role.persona(),
            instruction: role.instruction_template().replacen(TABLE_PLACEHOLDER, table, 1),
            expected_output: role.expected_output().to_string(),
        }
    }

    /// One task per role, in document order.
    pub fn for_sample(table: &str) -> Vec<Self> {
        AnalysisRole::ALL
            .iter()
            .map(|&role| Self::new(role, table))
            .collect()
    }

    /// Context appended after the instruction.
    pub fn context(&self) -> String {
        format!("Expected output: {}", self.expected_output)
    }
}

/// Text produced by one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub role: AnalysisRole,
    pub text: String,
    pub elapsed: Duration,
}

/// The concatenated pipeline output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    text: String,
    results: Vec<AnalysisResult>,
}

impl RawDocument {
    /// Joins results in role order, separated by a blank line.
    pub fn assemble(mut results: Vec<AnalysisResult>) -> Self {
        results.sort_by_key(|r| r.role.position());
        let text = results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Self { text, results }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
