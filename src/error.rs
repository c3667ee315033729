//! Error types for icp-journal operations.
//!
//! Defines error types for the subsystems that sit outside the agent layer:
//! - CSV loading and dataset construction
//! - Metric computation (logged, never propagated past the extractor)
//! - LLM API interactions
//! - Report export (HTML and JSON)

use thiserror::Error;

/// Errors that can occur while loading or building a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("CSV file has no header row")]
    EmptyHeader,

    #[error("Duplicate column '{0}' after header normalization")]
    DuplicateColumn(String),

    #[error("Row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A metric could not be computed from a present column.
///
/// The metrics extractor logs this and omits the affected entry.
#[derive(Debug, Error)]
pub enum MetricComputationError {
    #[error("Column '{column}' holds a non-numeric value '{value}'")]
    NonNumeric { column: String, value: String },

    #[error("Column '{0}' has no usable values")]
    NoValues(String),
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: OPENROUTER_API_KEY or LITELLM_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Missing API base URL: LITELLM_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while exporting a report.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Template rendering error: {0}")]
    Template(#[from] tera::Error),

    #[error("Chart '{title}' could not be read: {reason}")]
    ChartUnreadable { title: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
