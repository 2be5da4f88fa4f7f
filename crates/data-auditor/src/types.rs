use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Column name used for findings that belong to the dataset as a whole.
pub const DATASET_COLUMN: &str = "<dataset>";

/// Maximum number of example offending values carried by a finding.
pub const MAX_SAMPLE_VALUES: usize = 5;

// ============================================================================
// Semantic types
// ============================================================================

/// The inferred meaning of a column, beyond its storage representation.
///
/// Every column maps to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticType {
    Empty,
    Constant,
    Boolean,
    NumericDiscrete,
    NumericContinuous,
    Date,
    Datetime,
    Email,
    Phone,
    IdCandidate,
    Categorical,
    HighCardinality,
    Mixed,
}

impl SemanticType {
    pub const ALL: [SemanticType; 13] = [
        Self::Empty,
        Self::Constant,
        Self::Boolean,
        Self::NumericDiscrete,
        Self::NumericContinuous,
        Self::Date,
        Self::Datetime,
        Self::Email,
        Self::Phone,
        Self::IdCandidate,
        Self::Categorical,
        Self::HighCardinality,
        Self::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::Constant => "CONSTANT",
            Self::Boolean => "BOOLEAN",
            Self::NumericDiscrete => "NUMERIC_DISCRETE",
            Self::NumericContinuous => "NUMERIC_CONTINUOUS",
            Self::Date => "DATE",
            Self::Datetime => "DATETIME",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::IdCandidate => "ID_CANDIDATE",
            Self::Categorical => "CATEGORICAL",
            Self::HighCardinality => "HIGH_CARDINALITY",
            Self::Mixed => "MIXED",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::NumericDiscrete | Self::NumericContinuous)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Datetime)
    }

    /// Low-cardinality types whose values are treated as group labels.
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical | Self::Boolean)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Graded importance of a finding.
///
/// Variants are declared from mildest to most severe so that `Ord` (and
/// therefore `max()`) picks the worst severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Pass,
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most severe first.
    pub const DESCENDING: [Severity; 6] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Info,
        Self::Pass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Info => "INFO",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// A finding at this severity counts as a failed check.
    pub fn is_failing(&self) -> bool {
        !matches!(self, Self::Pass | Self::Info)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Findings
// ============================================================================

/// The uniform record produced by every check invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub check_id: String,
    /// Column name, or [`DATASET_COLUMN`] for dataset-wide findings.
    pub column: String,
    pub passed: bool,
    pub severity: Severity,
    pub value: Option<f64>,
    pub threshold: Option<f64>,
    pub message: String,
    pub affected_count: usize,
    /// Share of affected records, as a percentage (0-100).
    pub affected_pct: f64,
    pub sample_values: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Finding {
    /// Create a finding at the given severity. `passed` follows from it.
    pub fn new(
        check_id: impl Into<String>,
        column: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check_id: check_id.into(),
            column: column.into(),
            passed: !severity.is_failing(),
            severity,
            value: None,
            threshold: None,
            message: message.into(),
            affected_count: 0,
            affected_pct: 0.0,
            sample_values: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn pass(
        check_id: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(check_id, column, Severity::Pass, message)
    }

    pub fn info(
        check_id: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(check_id, column, Severity::Info, message)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self.passed = !severity.is_failing();
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(round_to(value, 6));
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Record the affected count out of `total` records.
    pub fn with_affected(mut self, count: usize, total: usize) -> Self {
        self.affected_count = count;
        self.affected_pct = if total > 0 {
            round_to(count as f64 / total as f64 * 100.0, 2)
        } else {
            0.0
        };
        self
    }

    /// Attach up to [`MAX_SAMPLE_VALUES`] example values.
    pub fn with_samples<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.sample_values = values
            .into_iter()
            .take(MAX_SAMPLE_VALUES)
            .map(|v| v.to_string())
            .collect();
        self
    }

    pub fn with_meta(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sort key giving the deterministic output order.
    pub fn sort_key(&self) -> (&str, &str) {
        (self.column.as_str(), self.check_id.as_str())
    }
}

/// Round to a fixed number of decimals; keeps serialized output stable.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// Scores
// ============================================================================

/// Letter grade derived from a 0-100 score via fixed cutoffs 90/75/60/40.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::A
        } else if score >= 75.0 {
            Self::B
        } else if score >= 60.0 {
            Self::C
        } else if score >= 40.0 {
            Self::D
        } else {
            Self::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        f.write_str(letter)
    }
}

/// One deduction applied to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deduction {
    pub check_id: String,
    pub severity: Severity,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScore {
    pub column: String,
    pub score: f64,
    pub grade: Grade,
    pub checks_run: usize,
    pub checks_failed: usize,
    pub issues_by_severity: BTreeMap<Severity, usize>,
    pub deductions: Vec<Deduction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetScore {
    pub score: f64,
    pub grade: Grade,
    pub columns_scored: usize,
    pub checks_run: usize,
    pub total_issues: usize,
    pub issues_by_severity: BTreeMap<Severity, usize>,
    /// Weight each column contributed to the weighted mean.
    pub weights: BTreeMap<String, f64>,
}
