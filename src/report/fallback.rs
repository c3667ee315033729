//! Deterministic narrative used when no text generator is available.
//!
//! The document has the same shape as a generated one: three `#` headings the
//! section router recognizes, each followed by sentences interpolated from the
//! dataset and its metrics. A section with too little material gets a fixed
//! closing paragraph so that insights and recommendations are never empty.

use crate::dataset::Dataset;

use super::metrics::{keys, MetricsSummary};

/// Below this many characters of sentences, the boilerplate is appended.
pub const MIN_CONTENT_CHARS: usize = 50;

pub const INSIGHTS_HEADING: &str = "# Key Insights";
pub const QUALITY_HEADING: &str = "# Data Quality Assessment";
pub const RECOMMENDATIONS_HEADING: &str = "# Recommendations";

const INSIGHTS_BOILERPLATE: &str = "The dataset does not contain enough of the expected customer \
columns (Plan, Monthly Spend, Churned, Tenure, Industry) for a detailed profile. Adding them \
will unlock plan, revenue and retention analysis.";

const QUALITY_BOILERPLATE: &str = "No further data quality checks could be run on this dataset.";

const RECOMMENDATIONS_BOILERPLATE: &str = "Capture plan, spend, churn and tenure for every \
customer so that future reports can make targeted recommendations. Start by addressing the \
data quality findings above.";

/// Builds the template document for `dataset`.
pub fn template_document(dataset: &Dataset, metrics: &MetricsSummary) -> String {
    let mut doc = format!(
        "Automated summary of {} customer records.\n\n",
        dataset.row_count()
    );

    push_section(&mut doc, INSIGHTS_HEADING, insight_sentences(metrics), INSIGHTS_BOILERPLATE);
    doc.push('\n');
    push_section(&mut doc, QUALITY_HEADING, quality_sentences(dataset), QUALITY_BOILERPLATE);
    doc.push('\n');
    push_section(
        &mut doc,
        RECOMMENDATIONS_HEADING,
        recommendation_sentences(metrics),
        RECOMMENDATIONS_BOILERPLATE,
    );

    doc
}

fn push_section(doc: &mut String, heading: &str, sentences: Vec<String>, boilerplate: &str) {
    let content_chars: usize = sentences.iter().map(|s| s.chars().count()).sum();

    doc.push_str(heading);
    doc.push('\n');
    for sentence in &sentences {
        doc.push_str("- ");
        doc.push_str(sentence);
        doc.push('\n');
    }
    if content_chars < MIN_CONTENT_CHARS {
        doc.push_str(boilerplate);
        doc.push('\n');
    }
}

fn top_plan(metrics: &MetricsSummary) -> Option<(&str, &str)> {
    metrics
        .distribution(keys::PLAN_DISTRIBUTION)
        .and_then(|d| d.first())
        .map(|s| (s.category.as_str(), s.share.as_str()))
}

fn insight_sentences(metrics: &MetricsSummary) -> Vec<String> {
    let mut out = Vec::new();

    if let Some((plan, share)) = top_plan(metrics) {
        out.push(format!(
            "The most common plan is {}, held by {} of customers.",
            plan, share
        ));
    }
    if let Some(mean) = metrics.scalar(keys::MONTHLY_SPEND_MEAN) {
        match metrics.scalar(keys::MONTHLY_SPEND_MEDIAN) {
            Some(median) => out.push(format!(
                "Customers spend {} per month on average (median {}).",
                mean, median
            )),
            None => out.push(format!("Customers spend {} per month on average.", mean)),
        }
    }
    if let Some(rate) = metrics.scalar(keys::CHURN_RATE) {
        out.push(format!("The churn rate is {}.", rate));
    }
    if let Some(tenure) = metrics.scalar(keys::TENURE_MEAN) {
        out.push(format!("Average customer tenure is {} months.", tenure));
    }
    if let Some(industries) = metrics.list(keys::TOP_INDUSTRIES).filter(|l| !l.is_empty()) {
        let top: Vec<&str> = industries.iter().take(3).map(String::as_str).collect();
        out.push(format!("The leading industries are {}.", top.join(", ")));
    }

    out
}

fn quality_sentences(dataset: &Dataset) -> Vec<String> {
    let mut out = vec![format!(
        "The dataset contains {} rows across {} columns.",
        dataset.row_count(),
        dataset.column_count()
    )];

    let gaps: Vec<String> = dataset
        .columns()
        .iter()
        .filter(|c| c.empty_count() > 0)
        .map(|c| format!("Column '{}' has {} missing values.", c.name(), c.empty_count()))
        .collect();
    if gaps.is_empty() {
        out.push("No missing values were found.".to_string());
    } else {
        out.extend(gaps);
    }

    match dataset.duplicate_row_count() {
        0 => out.push("No duplicate rows were found.".to_string()),
        1 => out.push("1 duplicate row was found.".to_string()),
        n => out.push(format!("{} duplicate rows were found.", n)),
    }

    out
}

fn recommendation_sentences(metrics: &MetricsSummary) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(rate) = metrics.scalar(keys::CHURN_RATE) {
        out.push(format!(
            "Run a retention review of churned accounts; churn currently stands at {}.",
            rate
        ));
    }
    if let Some((plan, _)) = top_plan(metrics) {
        out.push(format!(
            "Offer upgrade paths to customers on the {} plan, the largest segment.",
            plan
        ));
    }
    if let Some(industry) = metrics.list(keys::TOP_INDUSTRIES).and_then(|l| l.first()) {
        out.push(format!(
            "Focus acquisition campaigns on {} and adjacent industries.",
            industry
        ));
    }
    if let Some(mean) = metrics.scalar(keys::MONTHLY_SPEND_MEAN) {
        out.push(format!(
            "Review pricing tiers against the average monthly spend of {}.",
            mean
        ));
    }

    out
}
