//! icp-journal: Business Analyst ICP reports from customer CSV exports.
//!
//! This library loads a customer table, computes plan, spend, churn and tenure
//! metrics, runs three analyst agents over a bounded sample, routes their text
//! into report sections, and renders the result as JSON or self-contained HTML.

// Core modules
pub mod agents;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod report;

// Re-export commonly used error types
pub use error::{DatasetError, ExportError, LlmError, MetricComputationError};
