//! Self-contained HTML rendering of an [`AnalystReport`].
//!
//! All styling is inline and charts are embedded as base64 `data:` URIs, so
//! the output can be opened or mailed as a single file.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::error::ExportError;

use super::metrics::keys;
use super::sections::Section;
use super::AnalystReport;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A pre-rendered PNG chart to embed in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub title: String,
    pub caption: Option<String>,
    pub png: Vec<u8>,
}

impl ChartImage {
    pub fn new(title: impl Into<String>, png: Vec<u8>) -> Self {
        Self {
            title: title.into(),
            caption: None,
            png,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Reads a PNG file from disk.
    ///
    /// # Errors
    ///
    /// [`ExportError::ChartUnreadable`] if the file cannot be read or is not a PNG.
    pub fn from_png_file(title: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let title = title.into();
        let path = path.as_ref();

        let png = std::fs::read(path).map_err(|e| ExportError::ChartUnreadable {
            title: title.clone(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        if !png.starts_with(&PNG_SIGNATURE) {
            return Err(ExportError::ChartUnreadable {
                title,
                reason: format!("{} is not a PNG image", path.display()),
            });
        }

        Ok(Self::new(title, png))
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

#[derive(Serialize)]
struct MetricCard {
    label: &'static str,
    value: String,
}

#[derive(Serialize)]
struct ChartView {
    title: String,
    caption: String,
    data_uri: String,
}

#[derive(Serialize)]
struct Finding<'a> {
    title: &'static str,
    body: &'a str,
}

#[derive(Serialize)]
struct ProfileRow {
    label: &'static str,
    value: String,
}

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Business Analyst ICP Journal</title>
<style>
body {
  font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif;
  margin: 0;
  background: #f4f6f8;
  color: #2c3e50;
}
header {
  background: #2c3e50;
  color: #ffffff;
  padding: 24px 40px;
}
header h1 { margin: 0 0 6px 0; }
header p { margin: 0; opacity: 0.8; }
main { padding: 24px 40px; }
.cards {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
  gap: 16px;
}
.card {
  background: #ffffff;
  border-radius: 8px;
  padding: 16px;
  box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1);
}
.card .label { font-size: 0.85em; color: #7f8c8d; }
.card .value { font-size: 1.6em; font-weight: bold; margin-top: 4px; }
.chart {
  background: #ffffff;
  border-radius: 8px;
  padding: 16px;
  margin-top: 16px;
}
.chart img { max-width: 100%; }
.chart figcaption { color: #7f8c8d; margin-top: 8px; }
.finding {
  background: #ffffff;
  border-left: 4px solid #3498db;
  padding: 16px;
  margin-top: 16px;
}
table.profile { border-collapse: collapse; margin-top: 8px; }
table.profile td { padding: 4px 12px 4px 0; }
</style>
</head>
<body>
<header>
<h1>Business Analyst ICP Journal</h1>
<p>Generated {{ generated_at | escape }} from {{ row_count }} customer records ({{ mode | escape }} mode)</p>
</header>
<main>
<section>
<h2>Key Metrics</h2>
<div class="cards">
{% for card in cards %}<div class="card"><div class="label">{{ card.label | escape }}</div><div class="value">{{ card.value | escape }}</div></div>
{% endfor %}</div>
{% if profile %}<table class="profile">
{% for row in profile %}<tr><td><strong>{{ row.label | escape }}</strong></td><td>{{ row.value | escape }}</td></tr>
{% endfor %}</table>
{% endif %}</section>
{% if charts %}<section>
<h2>Charts</h2>
{% for chart in charts %}<figure class="chart">
<img src="{{ chart.data_uri }}" alt="{{ chart.title | escape }}">
<figcaption>{{ chart.caption | escape }}</figcaption>
</figure>
{% endfor %}</section>
{% endif %}{% if findings %}<section>
<h2>AI Analysis Findings</h2>
{% for finding in findings %}<div class="finding">
<h3>{{ finding.title | escape }}</h3>
<p>{{ finding.body | escape | linebreaksbr }}</p>
</div>
{% endfor %}</section>
{% endif %}</main>
</body>
</html>
"#;

/// Renders `report` as a standalone HTML page.
pub fn render_html(report: &AnalystReport, charts: &[ChartImage]) -> Result<String, ExportError> {
    let metrics = &report.metrics;
    let scalar_or_na = |key: &str| metrics.scalar(key).unwrap_or("N/A").to_string();

    let mut cards = vec![
        MetricCard {
            label: "Total Customers",
            value: metrics
                .scalar(keys::TOTAL_CUSTOMERS)
                .map(str::to_string)
                .unwrap_or_else(|| report.row_count.to_string()),
        },
        MetricCard {
            label: "Average Monthly Spend",
            value: scalar_or_na(keys::MONTHLY_SPEND_MEAN),
        },
        MetricCard {
            label: "Average Tenure",
            value: metrics
                .scalar(keys::TENURE_MEAN)
                .map(|t| format!("{} months", t))
                .unwrap_or_else(|| "N/A".to_string()),
        },
    ];
    if let Some(rate) = metrics.scalar(keys::CHURN_RATE) {
        cards.push(MetricCard {
            label: "Churn Rate",
            value: rate.to_string(),
        });
    }

    let profile: Vec<ProfileRow> = [
        ("Plan Distribution", keys::PLAN_DISTRIBUTION),
        ("Top Industries", keys::TOP_INDUSTRIES),
        ("Top Countries", keys::TOP_COUNTRIES),
        ("Top Signup Sources", keys::TOP_SIGNUP_SOURCES),
    ]
    .into_iter()
    .filter_map(|(label, key)| {
        metrics.get(key).map(|value| ProfileRow {
            label,
            value: value.to_string(),
        })
    })
    .collect();

    let chart_views: Vec<ChartView> = charts
        .iter()
        .map(|chart| ChartView {
            title: chart.title.clone(),
            caption: chart.caption.clone().unwrap_or_else(|| chart.title.clone()),
            data_uri: chart.data_uri(),
        })
        .collect();

    let findings: Vec<Finding<'_>> = [
        ("Key Insights", Section::Insights),
        ("Data Quality Assessment", Section::Quality),
        ("Strategic Recommendations", Section::Recommendations),
    ]
    .into_iter()
    .filter(|(_, section)| !report.sections.is_blank(*section))
    .map(|(title, section)| Finding {
        title,
        body: report.sections.get(section).trim(),
    })
    .collect();

    let mut context = tera::Context::new();
    context.insert(
        "generated_at",
        &report.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    context.insert("row_count", &report.row_count);
    context.insert("mode", &report.mode.to_string());
    context.insert("cards", &cards);
    context.insert("profile", &profile);
    context.insert("charts", &chart_views);
    context.insert("findings", &findings);

    Ok(tera::Tera::one_off(REPORT_TEMPLATE, &context, false)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::metrics::{MetricValue, MetricsSummary};
    use crate::report::sections::route;
    use crate::report::GenerationMode;
    use chrono::Utc;

    fn report_with(raw: &str, metrics: MetricsSummary) -> AnalystReport {
        AnalystReport {
            generated_at: Utc::now(),
            mode: GenerationMode::Agents,
            row_count: 120,
            sample_size: 50,
            raw_document: raw.to_string(),
            sections: route(raw),
            metrics,
        }
    }

    fn tiny_png() -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(b"fake-chunk-data");
        bytes
    }

    #[test]
    fn test_cards_and_findings() {
        let mut metrics = MetricsSummary::new();
        metrics.insert(keys::TOTAL_CUSTOMERS, MetricValue::Scalar("120".to_string()));
        metrics.insert(keys::MONTHLY_SPEND_MEAN, MetricValue::Scalar("$84.10".to_string()));
        metrics.insert(keys::CHURN_RATE, MetricValue::Scalar("12.5%".to_string()));

        let html = render_html(
            &report_with("# Key Insights\nLine one\nLine two\n", metrics),
            &[],
        )
        .expect("renders");

        assert!(html.contains("Total Customers"));
        assert!(html.contains("$84.10"));
        assert!(html.contains("Churn Rate"));
        assert!(html.contains("12.5%"));
        assert!(html.contains("Average Tenure"));
        assert!(html.contains("AI Analysis Findings"));
        assert!(html.contains("Key Insights"));
        assert!(html.contains("Line one<br>Line two"));
        assert!(!html.contains("Strategic Recommendations"));
        assert!(!html.contains("Data Quality Assessment"));
    }

    #[test]
    fn test_no_findings_section_when_buckets_blank() {
        let html = render_html(&report_with("plain intro only", MetricsSummary::new()), &[])
            .expect("renders");

        assert!(!html.contains("AI Analysis Findings"));
        assert!(!html.contains("Churn Rate"));
        assert!(html.contains("120"));
    }

    #[test]
    fn test_section_text_is_escaped() {
        let html = render_html(
            &report_with(
                "# Recommendations\n<script>alert(1)</script> & more",
                MetricsSummary::new(),
            ),
            &[],
        )
        .expect("renders");

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; more"));
    }

    #[test]
    fn test_output_is_self_contained() {
        let chart = ChartImage::new("Plan Distribution", tiny_png()).with_caption("Plans by share");
        let html = render_html(&report_with("# Insights\nok", MetricsSummary::new()), &[chart])
            .expect("renders");

        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("Plans by share"));
        assert!(!html.contains("http://"));
        assert!(!html.contains("https://"));
        assert!(!html.contains("<link"));
    }

    #[test]
    fn test_chart_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("plan.png");
        std::fs::write(&good, tiny_png()).expect("write png");
        let chart = ChartImage::from_png_file("Plans", &good).expect("valid png");
        assert_eq!(chart.png, tiny_png());
        assert!(chart.data_uri().starts_with("data:image/png;base64,iVBORw0KGgo"));

        let bad = dir.path().join("plan.txt");
        std::fs::write(&bad, b"not a png").expect("write txt");
        let err = ChartImage::from_png_file("Plans", &bad).unwrap_err();
        assert!(matches!(err, ExportError::ChartUnreadable { .. }));

        let missing = ChartImage::from_png_file("Plans", dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(missing, ExportError::ChartUnreadable { .. }));
    }
}
