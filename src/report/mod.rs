//! Report assembly: section routing, metrics, template narrative and export.

pub mod fallback;
pub mod html;
pub mod metrics;
pub mod sections;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ExportError;

pub use fallback::template_document;
pub use html::{render_html, ChartImage};
pub use metrics::{extract_metrics, CategoryShare, MetricValue, MetricsSummary};
pub use sections::{route, KeywordSectionRouter, Section, SectionMap, SectionRouter};

/// Shown instead of a report when the dataset has no rows.
pub const NO_DATA_MESSAGE: &str = "No data to analyze.";

/// Where the narrative text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// The three-task agent pipeline.
    Agents,
    /// The deterministic template.
    Template,
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::Agents => write!(f, "agents"),
            GenerationMode::Template => write!(f, "template"),
        }
    }
}

/// Result of a report request.
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    /// The dataset had no rows; nothing was generated.
    NoData,
    Report(AnalystReport),
}

impl ReportOutcome {
    pub fn report(&self) -> Option<&AnalystReport> {
        match self {
            ReportOutcome::Report(report) => Some(report),
            ReportOutcome::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, ReportOutcome::NoData)
    }
}

/// A complete analyst report.
#[derive(Debug, Clone)]
pub struct AnalystReport {
    pub generated_at: DateTime<Utc>,
    pub mode: GenerationMode,
    pub row_count: usize,
    pub sample_size: usize,
    pub raw_document: String,
    pub sections: SectionMap,
    pub metrics: MetricsSummary,
}

impl AnalystReport {
    /// The serializable view of this report.
    pub fn bundle(&self) -> ReportBundle<'_> {
        ReportBundle {
            generated_at: self.generated_at,
            mode: self.mode,
            row_count: self.row_count,
            sections: &self.sections,
            metrics: &self.metrics,
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(&self.bundle())?)
    }

    /// Writes HTML when `path` ends in `.html`, JSON otherwise.
    pub fn write_to(&self, path: &Path, charts: &[ChartImage]) -> Result<(), ExportError> {
        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));

        let body = if is_html {
            render_html(self, charts)?
        } else {
            self.to_json()?
        };
        std::fs::write(path, body)?;

        tracing::info!(path = %path.display(), html = is_html, "Report written");
        Ok(())
    }
}

/// JSON shape of an exported report.
#[derive(Debug, Serialize)]
pub struct ReportBundle<'a> {
    pub generated_at: DateTime<Utc>,
    pub mode: GenerationMode,
    pub row_count: usize,
    pub sections: &'a SectionMap,
    pub metrics: &'a MetricsSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> AnalystReport {
        let mut summary = MetricsSummary::new();
        summary.insert(metrics::keys::TOTAL_CUSTOMERS, MetricValue::Scalar("3".to_string()));
        let raw = "# Key Insights\nPro leads.\n# Recommendations\nUpsell.".to_string();

        AnalystReport {
            generated_at: Utc::now(),
            mode: GenerationMode::Template,
            row_count: 3,
            sample_size: 3,
            sections: route(&raw),
            raw_document: raw,
            metrics: summary,
        }
    }

    #[test]
    fn test_bundle_json_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&sample_report().to_json().expect("serializes")).expect("valid json");

        assert_eq!(json["mode"], "template");
        assert_eq!(json["row_count"], 3);
        assert_eq!(json["metrics"]["total_customers"], "3");
        assert_eq!(json["sections"]["insights"], "# Key Insights\nPro leads.\n");
        assert!(json["generated_at"].is_string());
        assert!(json.get("raw_document").is_none());
    }

    #[test]
    fn test_write_to_picks_format_from_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = sample_report();

        let json_path = dir.path().join("report.json");
        report.write_to(&json_path, &[]).expect("json written");
        let json = std::fs::read_to_string(&json_path).expect("readable");
        assert!(json.trim_start().starts_with('{'));

        let html_path = dir.path().join("report.HTML");
        report.write_to(&html_path, &[]).expect("html written");
        let html = std::fs::read_to_string(&html_path).expect("readable");
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_outcome_accessors() {
        assert!(ReportOutcome::NoData.is_no_data());
        assert!(ReportOutcome::NoData.report().is_none());
        assert!(ReportOutcome::Report(sample_report()).report().is_some());
    }
}
