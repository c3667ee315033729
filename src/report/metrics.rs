//! Dataset-derived metrics.
//!
//! [`extract_metrics`] is a pure function of the dataset and never fails. A
//! metric whose column is absent is simply not emitted; a metric whose column
//! is present but unreadable is logged at `warn` and omitted.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::dataset::{columns, is_placeholder, CellValue, Column, ColumnKind, Dataset};
use crate::error::MetricComputationError;

/// Metric names emitted by [`extract_metrics`].
pub mod keys {
    pub const TOTAL_CUSTOMERS: &str = "total_customers";
    pub const PLAN_DISTRIBUTION: &str = "plan_distribution";
    pub const MONTHLY_SPEND_MEAN: &str = "monthly_spend_mean";
    pub const MONTHLY_SPEND_MEDIAN: &str = "monthly_spend_median";
    pub const MONTHLY_SPEND_MAX: &str = "monthly_spend_max";
    pub const CHURN_RATE: &str = "churn_rate";
    pub const TENURE_MEAN: &str = "tenure_mean";
    pub const TENURE_MEDIAN: &str = "tenure_median";
    pub const TOP_INDUSTRIES: &str = "top_industries";
    pub const TOP_COUNTRIES: &str = "top_countries";
    pub const TOP_SIGNUP_SOURCES: &str = "top_signup_sources";
}

const TOP_INDUSTRY_COUNT: usize = 5;
const TOP_COUNTRY_COUNT: usize = 5;
const TOP_SIGNUP_SOURCE_COUNT: usize = 3;

/// One category's share of a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub share: String,
}

/// A formatted metric value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(String),
    List(Vec<String>),
    Distribution(Vec<CategoryShare>),
}

impl MetricValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            MetricValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MetricValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_distribution(&self) -> Option<&[CategoryShare]> {
        match self {
            MetricValue::Distribution(shares) => Some(shares),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Scalar(s) => f.write_str(s),
            MetricValue::List(items) => f.write_str(&items.join(", ")),
            MetricValue::Distribution(shares) => {
                let parts: Vec<String> = shares
                    .iter()
                    .map(|s| format!("{} {}", s.category, s.share))
                    .collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

/// Metric name to value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSummary {
    entries: Vec<(String, MetricValue)>,
}

impl MetricsSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a metric. Replacement keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: MetricValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(MetricValue::as_scalar)
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(MetricValue::as_list)
    }

    pub fn distribution(&self, name: &str) -> Option<&[CategoryShare]> {
        self.get(name).and_then(MetricValue::as_distribution)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for MetricsSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Computes every metric whose column is present in `dataset`.
pub fn extract_metrics(dataset: &Dataset) -> MetricsSummary {
    let mut summary = MetricsSummary::new();

    summary.insert(
        keys::TOTAL_CUSTOMERS,
        MetricValue::Scalar(dataset.row_count().to_string()),
    );

    if let Some(plan) = dataset.column(columns::PLAN) {
        if let Some(shares) = distribution(plan) {
            summary.insert(keys::PLAN_DISTRIBUTION, MetricValue::Distribution(shares));
        }
    }

    if let Some(spend) = dataset.column(columns::MONTHLY_SPEND) {
        match spend.numeric_summary() {
            Ok(stats) => {
                summary.insert(keys::MONTHLY_SPEND_MEAN, money(stats.mean));
                summary.insert(keys::MONTHLY_SPEND_MEDIAN, money(stats.median));
                summary.insert(keys::MONTHLY_SPEND_MAX, money(stats.max));
            }
            Err(e) => warn_omitted("monthly spend", &e),
        }
    }

    if let Some(churn) = dataset.column(columns::CHURN) {
        summary.insert(
            keys::CHURN_RATE,
            MetricValue::Scalar(format!("{:.1}%", churn_rate(churn))),
        );
    }

    if let Some(tenure) = dataset.column(columns::TENURE) {
        match tenure.numeric_summary() {
            Ok(stats) => {
                summary.insert(keys::TENURE_MEAN, MetricValue::Scalar(format!("{:.1}", stats.mean)));
                summary.insert(
                    keys::TENURE_MEDIAN,
                    MetricValue::Scalar(format!("{:.1}", stats.median)),
                );
            }
            Err(e) => warn_omitted("tenure", &e),
        }
    }

    let ranked = [
        (columns::INDUSTRY, keys::TOP_INDUSTRIES, TOP_INDUSTRY_COUNT),
        (columns::COUNTRY, keys::TOP_COUNTRIES, TOP_COUNTRY_COUNT),
        (columns::SIGNUP_SOURCE, keys::TOP_SIGNUP_SOURCES, TOP_SIGNUP_SOURCE_COUNT),
    ];
    for (column, key, limit) in ranked {
        if let Some(col) = dataset.column(column) {
            summary.insert(key, MetricValue::List(top_categories(col, limit)));
        }
    }

    tracing::debug!(metrics = summary.len(), rows = dataset.row_count(), "Extracted metrics");
    summary
}

/// Percentage of churned customers among non-empty cells.
///
/// Tries, in order: a native boolean column, coercion of every cell to a
/// flag, and finally a count of the exact label `True`. Returns 0 when none
/// of those yield anything.
pub fn churn_rate(column: &Column) -> f64 {
    let present: Vec<&CellValue> = column
        .values()
        .iter()
        .filter(|v| !v.is_empty() && !matches!(v, CellValue::Text(s) if is_placeholder(s)))
        .collect();
    if present.is_empty() {
        return 0.0;
    }
    let total = present.len() as f64;

    if column.kind() == ColumnKind::Boolean {
        let flags: Option<Vec<bool>> = present
            .iter()
            .map(|v| match v {
                CellValue::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        if let Some(flags) = flags {
            return percent_true(&flags, total);
        }
    }

    let coerced: Option<Vec<bool>> = present.iter().map(|v| coerce_flag(v)).collect();
    if let Some(flags) = coerced {
        return percent_true(&flags, total);
    }

    column
        .value_counts()
        .into_iter()
        .find(|(label, _)| label == "True")
        .map(|(_, count)| count as f64 / total * 100.0)
        .unwrap_or(0.0)
}

/// Most frequent labels, ties in first-seen order.
pub fn top_categories(column: &Column, limit: usize) -> Vec<String> {
    column
        .value_counts()
        .into_iter()
        .take(limit)
        .map(|(label, _)| label)
        .collect()
}

fn distribution(column: &Column) -> Option<Vec<CategoryShare>> {
    let non_empty = column.non_empty_count();
    if non_empty == 0 {
        tracing::warn!(column = column.name(), "Omitting distribution for empty column");
        return None;
    }

    Some(
        column
            .value_counts()
            .into_iter()
            .map(|(category, count)| CategoryShare {
                category,
                share: format!("{:.1}%", count as f64 / non_empty as f64 * 100.0),
            })
            .collect(),
    )
}

fn coerce_flag(value: &CellValue) -> Option<bool> {
    match value {
        CellValue::Bool(b) => Some(*b),
        CellValue::Number(n) if *n == 1.0 => Some(true),
        CellValue::Number(n) if *n == 0.0 => Some(false),
        CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "t" | "y" => Some(true),
            "false" | "no" | "0" | "f" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn percent_true(flags: &[bool], total: f64) -> f64 {
    flags.iter().filter(|f| **f).count() as f64 / total * 100.0
}

fn money(value: f64) -> MetricValue {
    MetricValue::Scalar(format!("${:.2}", value))
}

fn warn_omitted(metric: &str, err: &MetricComputationError) {
    tracing::warn!(metric, error = %err, "Omitting metric");
}
