//! The check library.
//!
//! Every check is a plain function from a context to a [`Finding`] (column
//! checks) or a list of findings (dataset-wide checks). Checks only read
//! their inputs; faults are returned as [`CheckError`](crate::error::CheckError)
//! and turned into findings by the executor.

pub mod benford;
pub mod categorical;
pub mod cross_column;
pub mod dates;
pub mod hypothesis;
pub mod ids;
pub mod null_patterns;
pub mod numeric;
pub mod pii;
pub mod temporal;
pub mod text;
pub mod universal;

#[cfg(test)]
pub(crate) mod testing;

pub use temporal::TimeIndex;

use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;

use crate::error::CheckResult;
use crate::profiler::{Classification, ColumnProfile, Dataset};
use crate::registry::ResolvedCheck;
use crate::stats::normality::{NormalityGate, evaluate_gate};
use crate::types::{DATASET_COLUMN, Finding, SemanticType, Severity};

/// Non-null values most numeric checks need before they say anything.
pub const MIN_NUMERIC_N: usize = 10;

// ============================================================================
// Column checks
// ============================================================================

/// Everything a per-column check may read.
pub struct CheckContext<'a> {
    /// The values this check runs on (a stratified sample for costly checks
    /// on large inputs).
    pub profile: &'a ColumnProfile,
    /// The whole column.
    pub full_profile: &'a ColumnProfile,
    pub classification: &'a Classification,
    pub check: &'a ResolvedCheck<'a>,
    pub dataset: &'a Dataset,
    /// Classifications aligned with `dataset.columns()`.
    pub classifications: &'a [Classification],
    /// Per-column normality gate, evaluated on first use.
    pub gate: &'a OnceCell<Option<NormalityGate>>,
    pub reference_time: NaiveDateTime,
    pub seed: u64,
}

impl<'a> CheckContext<'a> {
    pub fn id(&self) -> &'static str {
        self.check.id()
    }

    pub fn column(&self) -> &str {
        self.profile.name()
    }

    pub fn param(&self, name: &str) -> CheckResult<f64> {
        self.check.param(name)
    }

    /// The cached normality gate of the full column.
    pub fn normality_gate(&self) -> Option<&NormalityGate> {
        self.gate
            .get_or_init(|| evaluate_gate(self.full_profile.numeric_values(), self.seed))
            .as_ref()
    }

    /// Other columns of the dataset with their classifications.
    pub fn other_columns(&self) -> impl Iterator<Item = (&'a ColumnProfile, &'a Classification)> {
        let name = self.full_profile.name();
        self.dataset
            .columns()
            .iter()
            .zip(self.classifications.iter())
            .filter(move |(profile, _)| profile.name() != name)
    }

    pub fn finding(&self, severity: Severity, message: impl Into<String>) -> Finding {
        Finding::new(self.id(), self.column(), severity, message)
    }

    pub fn pass(&self, message: impl Into<String>) -> Finding {
        Finding::pass(self.id(), self.column(), message)
    }

    pub fn info(&self, message: impl Into<String>) -> Finding {
        Finding::info(self.id(), self.column(), message)
    }

    /// PASS for inputs too small to judge.
    pub fn insufficient(&self, have: usize, need: usize) -> Finding {
        self.pass(format!("insufficient data ({} values, need {})", have, need))
            .with_meta("insufficient_data", true)
    }

    /// Grade `value` against the resolved threshold table.
    pub fn graded(&self, value: f64, message: impl Into<String>) -> Finding {
        grade(self.check, self.column(), value, message)
    }
}

// ============================================================================
// Dataset checks
// ============================================================================

/// Everything a dataset-wide check may read.
pub struct DatasetContext<'a> {
    pub dataset: &'a Dataset,
    /// Classifications aligned with `dataset.columns()`.
    pub classifications: &'a [Classification],
    pub check: &'a ResolvedCheck<'a>,
    pub time_index: Option<&'a TimeIndex>,
    pub seed: u64,
}

impl<'a> DatasetContext<'a> {
    pub fn id(&self) -> &'static str {
        self.check.id()
    }

    pub fn param(&self, name: &str) -> CheckResult<f64> {
        self.check.param(name)
    }

    /// Columns whose semantic type satisfies `predicate`, in input order.
    pub fn columns_where(
        &self,
        predicate: impl Fn(SemanticType) -> bool,
    ) -> Vec<(&'a ColumnProfile, &'a Classification)> {
        self.dataset
            .columns()
            .iter()
            .zip(self.classifications.iter())
            .filter(|(_, classification)| predicate(classification.semantic_type))
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<&'a ColumnProfile> {
        self.columns_where(|t| t.is_numeric())
            .into_iter()
            .map(|(profile, _)| profile)
            .collect()
    }

    pub fn pass(&self, message: impl Into<String>) -> Finding {
        Finding::pass(self.id(), DATASET_COLUMN, message)
    }

    pub fn finding(&self, column: &str, severity: Severity, message: impl Into<String>) -> Finding {
        Finding::new(self.id(), column, severity, message)
    }

    pub fn graded(&self, column: &str, value: f64, message: impl Into<String>) -> Finding {
        grade(self.check, column, value, message)
    }
}

fn grade(
    check: &ResolvedCheck<'_>,
    column: &str,
    value: f64,
    message: impl Into<String>,
) -> Finding {
    let finding = match check.thresholds.evaluate(value) {
        Some((threshold, severity)) => {
            Finding::new(check.id(), column, severity, message).with_threshold(threshold)
        }
        None => Finding::pass(check.id(), column, message),
    };
    if value.is_finite() {
        finding.with_value(value)
    } else {
        finding
    }
}

/// Share of `count` in `total` (0 when `total` is 0).
pub(crate) fn share(count: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}

/// Format a fraction as a percentage for messages.
pub(crate) fn pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}
