//! Tabular customer dataset.
//!
//! A [`Dataset`] is an immutable, column-oriented table loaded from CSV.
//! Each column carries an inferred [`ColumnKind`] and its cells are stored
//! as [`CellValue`]s, so the metrics extractor can tell a native boolean
//! column from a string-encoded one.
//!
//! Header names are normalized on load (see [`normalize_header`]) so that the
//! display headers of the customer export map onto the names the rest of the
//! crate expects.

pub mod sampler;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::{DatasetError, MetricComputationError};

pub use sampler::{sample, Sample, DEFAULT_SAMPLE_CAP, DEFAULT_SAMPLE_SEED};

/// Normalized column names understood by the metrics extractor.
pub mod columns {
    pub const PLAN: &str = "Plan";
    pub const MONTHLY_SPEND: &str = "MonthlySpend";
    pub const CHURN: &str = "Churn";
    pub const TENURE: &str = "Tenure";
    pub const INDUSTRY: &str = "Industry";
    pub const COUNTRY: &str = "Country";
    pub const SIGNUP_SOURCE: &str = "SignupSource";
}

/// Display headers of the customer export and their normalized names.
const HEADER_RENAMES: &[(&str, &str)] = &[
    ("Monthly Spend ($)", columns::MONTHLY_SPEND),
    ("Tenure (Months)", columns::TENURE),
    ("Churned", columns::CHURN),
    ("Signup Source", columns::SIGNUP_SOURCE),
];

/// Cell texts treated as missing in every column.
const MISSING_MARKERS: &[&str] = &["", "nan", "null"];

/// Placeholders treated as missing only where a number or flag is expected.
/// In text columns they are real labels (`NA` is Namibia).
const TYPED_MISSING_MARKERS: &[&str] = &["na", "n/a", "none"];

/// Maps a raw CSV header to the name used inside the crate.
///
/// Known display headers are renamed; anything else is only trimmed.
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim();
    HEADER_RENAMES
        .iter()
        .find(|(display, _)| *display == trimmed)
        .map(|(_, normalized)| (*normalized).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Label used for value counts. `None` for empty cells.
    ///
    /// Booleans render as `True`/`False` so that a lookup of the `True`
    /// label behaves the same for native and string-encoded flags.
    pub fn label(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Boolean,
    Numeric,
    Text,
}

/// Mean, median and max over the numeric cells of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
}

impl NumericSummary {
    /// Summarizes a non-empty slice. Returns `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            count,
            mean,
            median,
            max,
        })
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<CellValue>,
    // source text of each cell, used when the table goes back out as CSV
    raw: Vec<String>,
}

impl Column {
    /// Builds a column from raw cell texts, inferring its kind.
    pub fn from_raw(name: impl Into<String>, raw: &[String]) -> Self {
        let kind = infer_kind(raw.iter().map(String::as_str));
        let values = raw.iter().map(|cell| parse_cell(cell, kind)).collect();
        Self {
            name: name.into(),
            kind,
            values,
            raw: raw.to_vec(),
        }
    }

    /// Builds a column from already-typed cells.
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<CellValue>) -> Self {
        let raw = values.iter().map(CellValue::to_string).collect();
        Self {
            name: name.into(),
            kind,
            values,
            raw,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// Cell texts as they appeared in the source.
    pub fn raw_values(&self) -> &[String] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of non-empty cells.
    pub fn non_empty_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_empty()).count()
    }

    /// Number of empty cells.
    pub fn empty_count(&self) -> usize {
        self.len() - self.non_empty_count()
    }

    /// Frequency of each label, most frequent first.
    ///
    /// Ties keep the order in which labels were first encountered.
    /// Empty cells are not counted.
    pub fn value_counts(&self) -> Vec<(String, usize)> {
        let mut order: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for label in self.values.iter().filter_map(CellValue::label) {
            match index.get(&label) {
                Some(&pos) => order[pos].1 += 1,
                None => {
                    index.insert(label.clone(), order.len());
                    order.push((label, 1));
                }
            }
        }

        // stable sort keeps first-seen order among equal counts
        order.sort_by(|a, b| b.1.cmp(&a.1));
        order
    }

    /// Reads every non-empty cell as a number.
    ///
    /// Text cells are accepted when they parse after stripping currency
    /// symbols and thousands separators (e.g. `"$1,200.50"`).
    pub fn numeric_values(&self) -> Result<Vec<f64>, MetricComputationError> {
        let mut out = Vec::with_capacity(self.values.len());
        for cell in &self.values {
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) if is_placeholder(s) => {}
                CellValue::Number(n) => out.push(*n),
                CellValue::Text(s) => {
                    let cleaned: String = s
                        .trim()
                        .chars()
                        .filter(|c| *c != '$' && *c != ',')
                        .collect();
                    let value = cleaned.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(
                        || MetricComputationError::NonNumeric {
                            column: self.name.clone(),
                            value: s.clone(),
                        },
                    )?;
                    out.push(value);
                }
                CellValue::Bool(b) => {
                    return Err(MetricComputationError::NonNumeric {
                        column: self.name.clone(),
                        value: b.to_string(),
                    })
                }
            }
        }
        Ok(out)
    }

    /// Mean, median and max of the column's numeric view.
    pub fn numeric_summary(&self) -> Result<NumericSummary, MetricComputationError> {
        let values = self.numeric_values()?;
        NumericSummary::from_values(&values)
            .ok_or_else(|| MetricComputationError::NoValues(self.name.clone()))
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
            raw: indices.iter().map(|&i| self.raw[i].clone()).collect(),
        }
    }
}

/// An immutable table of customer rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Creates a dataset from columns of equal length.
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.clone()) {
                return Err(DatasetError::DuplicateColumn(column.name.clone()));
            }
        }

        let row_count = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(DatasetError::RaggedRow {
                row: row_count.min(bad.len()),
                expected: row_count,
                found: bad.len(),
            });
        }

        Ok(Self { columns, row_count })
    }

    /// Creates a dataset from a header row and raw string rows.
    ///
    /// Headers are normalized and column kinds are inferred.
    pub fn from_rows(headers: &[String], rows: &[Vec<String>]) -> Result<Self, DatasetError> {
        if headers.is_empty() {
            return Err(DatasetError::EmptyHeader);
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(DatasetError::RaggedRow {
                    row: i + 1,
                    expected: headers.len(),
                    found: row.len(),
                });
            }
        }

        let columns = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let raw: Vec<String> = rows.iter().map(|row| row[col].clone()).collect();
                Column::from_raw(normalize_header(header), &raw)
            })
            .collect();

        Self::new(columns)
    }

    /// Loads a dataset from CSV text.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(DatasetError::EmptyHeader);
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::from_rows(&headers, &rows)
    }

    /// Loads a dataset from a CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns a new dataset holding the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.select(indices)).collect(),
            row_count: indices.len(),
        }
    }

    /// Renders one row as display strings.
    pub fn row(&self, index: usize) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.values[index].to_string())
            .collect()
    }

    /// Renders one row exactly as it appeared in the source.
    pub fn raw_row(&self, index: usize) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.raw[index].as_str())
            .collect()
    }

    /// Number of rows that repeat an earlier row exactly.
    pub fn duplicate_row_count(&self) -> usize {
        let mut seen = HashSet::new();
        (0..self.row_count)
            .filter(|&i| !seen.insert(self.raw_row(i)))
            .count()
    }

    /// Serializes the table as CSV with a header row and no index column.
    ///
    /// Cells are written with their source text, so `007` and `10.50` are
    /// not reformatted.
    pub fn to_csv_string(&self) -> Result<String, DatasetError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(self.column_names())?;
        for i in 0..self.row_count {
            writer.write_record(self.raw_row(i))?;
        }
        writer.flush()?;

        let bytes = writer
            .into_inner()
            .map_err(|e| DatasetError::Io(std::io::Error::new(e.error().kind(), e.to_string())))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn matches_marker(raw: &str, markers: &[&str]) -> bool {
    let trimmed = raw.trim();
    markers.iter().any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// Whether a text cell is a placeholder such as `n/a` or `None`, which only
/// counts as missing where a number or flag is expected.
pub fn is_placeholder(raw: &str) -> bool {
    matches_marker(raw, TYPED_MISSING_MARKERS)
}

/// Whether `raw` is a missing value in a column of `kind`.
fn is_missing(raw: &str, kind: ColumnKind) -> bool {
    matches_marker(raw, MISSING_MARKERS)
        || (kind != ColumnKind::Text && is_placeholder(raw))
}

fn parse_bool_literal(raw: &str) -> Option<bool> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> ColumnKind {
    // placeholders must not stop a numeric or flag column from being inferred
    let mut present = cells
        .filter(|c| !is_missing(c, ColumnKind::Numeric))
        .peekable();
    if present.peek().is_none() {
        return ColumnKind::Text;
    }
    if present.clone().all(|c| parse_bool_literal(c).is_some()) {
        ColumnKind::Boolean
    } else if present.all(|c| parse_number(c).is_some()) {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

fn parse_cell(raw: &str, kind: ColumnKind) -> CellValue {
    if is_missing(raw, kind) {
        return CellValue::Empty;
    }
    match kind {
        ColumnKind::Boolean => parse_bool_literal(raw)
            .map(CellValue::Bool)
            .unwrap_or_else(|| CellValue::Text(raw.to_string())),
        ColumnKind::Numeric => parse_number(raw)
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(raw.to_string())),
        ColumnKind::Text => CellValue::Text(raw.to_string()),
    }
}
