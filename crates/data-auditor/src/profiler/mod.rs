//! Column profiling and semantic type classification.
//!
//! This module provides:
//! - [`ColumnProfile`]: the immutable per-column view shared by every check
//! - [`Dataset`]: the ordered set of profiles for one audit run
//! - [`DataProfiler`]: builds profiles from polars `DataFrame`s
//! - [`load_csv`]: reads a CSV file into a [`Dataset`]
//! - [`TypeClassifier`]: assigns exactly one [`SemanticType`](crate::types::SemanticType)
//!   per column

pub mod dates;
mod loader;
pub mod statistics;
pub mod type_inference;

pub use loader::load_csv;
pub use type_inference::{Classification, TypeClassifier};

use crate::error::{AuditError, Result, ResultExt};
use crate::utils::{is_null_raw, is_numeric_dtype, parse_plain_number, value_counts};
use once_cell::sync::OnceCell;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

/// Best-effort typed view of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValues {
    /// Every non-null value coerced to a finite float; `None` marks nulls.
    Numeric(Vec<Option<f64>>),
    /// Not numeric; the raw text is authoritative.
    Text,
}

/// Statistics derived once when a profile is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileStats {
    pub row_count: usize,
    pub null_count: usize,
    pub non_null_count: usize,
    pub distinct_count: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub mean_length: f64,
}

/// Immutable per-column view: raw text, typed values and derived stats.
///
/// Checks receive profiles by shared reference and never mutate them.
/// Expensive derived views (value counts, numeric values) are computed
/// lazily, at most once.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    name: String,
    raw: Vec<String>,
    typed: TypedValues,
    stats: ProfileStats,
    counts: OnceCell<Vec<(String, usize)>>,
    numbers: OnceCell<Vec<f64>>,
}

impl ColumnProfile {
    /// Build a profile from raw values and a typed view of the same length.
    pub fn new(name: impl Into<String>, raw: Vec<String>, typed: TypedValues) -> Result<Self> {
        let name = name.into();
        if let TypedValues::Numeric(values) = &typed
            && values.len() != raw.len()
        {
            return Err(AuditError::ProfilingFailed(format!(
                "column '{}' has {} raw values but {} typed values",
                name,
                raw.len(),
                values.len()
            )));
        }

        let stats = compute_stats(&raw);
        Ok(Self {
            name,
            raw,
            typed,
            stats,
            counts: OnceCell::new(),
            numbers: OnceCell::new(),
        })
    }

    /// Build a profile from raw text alone, coercing to numeric when every
    /// non-null value parses as a float.
    pub fn from_raw(name: impl Into<String>, raw: Vec<String>) -> Self {
        let typed = coerce_typed(&raw);
        let stats = compute_stats(&raw);
        Self {
            name: name.into(),
            raw,
            typed,
            stats,
            counts: OnceCell::new(),
            numbers: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn typed(&self) -> &TypedValues {
        &self.typed
    }

    pub fn stats(&self) -> &ProfileStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.typed, TypedValues::Numeric(_))
    }

    /// Share of null values (0.0 - 1.0).
    pub fn null_ratio(&self) -> f64 {
        if self.stats.row_count == 0 {
            return 0.0;
        }
        self.stats.null_count as f64 / self.stats.row_count as f64
    }

    /// Whether the value at `row` is null.
    pub fn is_null_at(&self, row: usize) -> bool {
        match &self.typed {
            TypedValues::Numeric(values) => values.get(row).is_none_or(|v| v.is_none()),
            TypedValues::Text => self.raw.get(row).is_none_or(|v| is_null_raw(v)),
        }
    }

    /// Trimmed non-null raw values, in row order.
    pub fn non_null_values(&self) -> impl Iterator<Item = &str> {
        self.raw
            .iter()
            .map(|v| v.trim())
            .filter(|v| !is_null_raw(v))
    }

    /// Non-null numeric values in row order (empty for text columns).
    pub fn numeric_values(&self) -> &[f64] {
        self.numbers.get_or_init(|| match &self.typed {
            TypedValues::Numeric(values) => values.iter().flatten().copied().collect(),
            TypedValues::Text => Vec::new(),
        })
    }

    /// Numeric value per row (`None` for nulls and for text columns).
    pub fn numeric_at(&self, row: usize) -> Option<f64> {
        match &self.typed {
            TypedValues::Numeric(values) => values.get(row).copied().flatten(),
            TypedValues::Text => None,
        }
    }

    /// Counts of trimmed non-null values, most frequent first.
    pub fn value_counts(&self) -> &[(String, usize)] {
        self.counts.get_or_init(|| {
            value_counts(self.non_null_values())
                .into_iter()
                .map(|(v, c)| (v.to_string(), c))
                .collect()
        })
    }

    /// Most frequent value and its count.
    pub fn top_value(&self) -> Option<(&str, usize)> {
        self.value_counts().first().map(|(v, c)| (v.as_str(), *c))
    }

    /// A new profile restricted to the given row indices.
    pub fn subset(&self, rows: &[usize]) -> Self {
        let raw: Vec<String> = rows
            .iter()
            .filter_map(|&i| self.raw.get(i).cloned())
            .collect();
        let typed = match &self.typed {
            TypedValues::Numeric(values) => TypedValues::Numeric(
                rows.iter().filter_map(|&i| values.get(i).copied()).collect(),
            ),
            TypedValues::Text => TypedValues::Text,
        };
        let stats = compute_stats(&raw);
        Self {
            name: self.name.clone(),
            raw,
            typed,
            stats,
            counts: OnceCell::new(),
            numbers: OnceCell::new(),
        }
    }
}

fn compute_stats(raw: &[String]) -> ProfileStats {
    let mut null_count = 0;
    let mut distinct: HashSet<&str> = HashSet::new();
    let mut min_length = usize::MAX;
    let mut max_length = 0;
    let mut total_length = 0usize;

    for value in raw {
        let trimmed = value.trim();
        if is_null_raw(trimmed) {
            null_count += 1;
            continue;
        }
        distinct.insert(trimmed);
        let len = trimmed.chars().count();
        min_length = min_length.min(len);
        max_length = max_length.max(len);
        total_length += len;
    }

    let non_null_count = raw.len() - null_count;
    ProfileStats {
        row_count: raw.len(),
        null_count,
        non_null_count,
        distinct_count: distinct.len(),
        min_length: if non_null_count == 0 { 0 } else { min_length },
        max_length,
        mean_length: if non_null_count == 0 {
            0.0
        } else {
            total_length as f64 / non_null_count as f64
        },
    }
}

/// Numeric when at least one value is present and every non-null value
/// parses as a plain float.
fn coerce_typed(raw: &[String]) -> TypedValues {
    let mut values = Vec::with_capacity(raw.len());
    let mut seen = 0;
    for value in raw {
        if is_null_raw(value) {
            values.push(None);
            continue;
        }
        match parse_plain_number(value) {
            Some(v) => {
                values.push(Some(v));
                seen += 1;
            }
            None => return TypedValues::Text,
        }
    }
    if seen == 0 {
        TypedValues::Text
    } else {
        TypedValues::Numeric(values)
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// The ordered column profiles of one dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<ColumnProfile>,
    row_count: usize,
}

impl Dataset {
    /// Assemble a dataset. Fails when no columns are supplied or when column
    /// lengths disagree.
    pub fn new(columns: Vec<ColumnProfile>) -> Result<Self> {
        let Some(first) = columns.first() else {
            return Err(AuditError::NoColumns);
        };
        let row_count = first.len();
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(AuditError::ProfilingFailed(format!(
                "column '{}' has {} rows, expected {}",
                bad.name(),
                bad.len(),
                row_count
            )));
        }
        Ok(Self { columns, row_count })
    }

    pub fn columns(&self) -> &[ColumnProfile] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

// ============================================================================
// DataProfiler
// ============================================================================

/// Builds column profiles from polars frames.
pub struct DataProfiler;

impl DataProfiler {
    /// Profile a single frame: the raw view is each column cast to text.
    pub fn profile_dataframe(df: &DataFrame) -> Result<Dataset> {
        let columns = df
            .get_columns()
            .iter()
            .map(|col| Self::profile_series(col.as_materialized_series(), None))
            .collect::<Result<Vec<_>>>()?;
        Dataset::new(columns)
    }

    /// Profile a pair of frames read from the same source: `raw` holds every
    /// column as unparsed text, `typed` holds the inferred dtypes.
    pub fn profile_frames(raw: &DataFrame, typed: &DataFrame) -> Result<Dataset> {
        if raw.height() != typed.height() {
            return Err(AuditError::ProfilingFailed(format!(
                "raw frame has {} rows but typed frame has {}",
                raw.height(),
                typed.height()
            )));
        }

        let mut columns = Vec::with_capacity(raw.width());
        for col in raw.get_columns() {
            let name = col.name().as_str();
            let typed_col = typed
                .column(name)
                .map_err(|_| AuditError::ColumnNotFound(name.to_string()))?;
            let profile = Self::profile_series(
                col.as_materialized_series(),
                Some(typed_col.as_materialized_series()),
            )?;
            columns.push(profile);
        }
        Dataset::new(columns)
    }

    /// Build one profile. `typed` defaults to the raw series itself.
    pub fn profile_series(raw: &Series, typed: Option<&Series>) -> Result<ColumnProfile> {
        let name = raw.name().to_string();
        let raw_values = series_to_strings(raw)
            .context(format!("Failed to read column '{}' as text", name))?;

        let typed_series = typed.unwrap_or(raw);
        let typed_values = if is_numeric_dtype(typed_series.dtype()) {
            let floats = typed_series
                .cast(&DataType::Float64)
                .context(format!("Failed to cast column '{}' to Float64", name))?;
            let values = floats
                .f64()
                .context(format!("Column '{}' is not Float64 after cast", name))?
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();
            TypedValues::Numeric(values)
        } else if matches!(typed_series.dtype(), DataType::String) {
            coerce_typed(&raw_values)
        } else {
            TypedValues::Text
        };

        ColumnProfile::new(name, raw_values, typed_values)
    }
}

fn series_to_strings(series: &Series) -> PolarsResult<Vec<String>> {
    let text = series.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string).unwrap_or_default())
        .collect())
}
