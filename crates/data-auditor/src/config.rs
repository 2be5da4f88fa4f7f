//! Configuration types for the data quality auditor.
//!
//! An [`AuditConfig`] is an explicit, immutable value threaded through
//! classification, check resolution, execution and scoring. Use the builder
//! for programmatic setup or [`AuditConfig::from_json_file`] to load overrides
//! prepared by a configuration collaborator.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::registry::{CheckRegistry, ThresholdTable};
use crate::types::Severity;

/// Scoring overrides: points deducted per severity and per-column weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points subtracted from 100 for each failing finding at a severity.
    pub deductions: BTreeMap<Severity, f64>,

    /// Explicit weights replacing the `1 / (1 + null_rate)` default.
    pub column_weights: BTreeMap<String, f64>,
}

fn default_deduction(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 25.0,
        Severity::High => 10.0,
        Severity::Medium => 5.0,
        Severity::Low => 2.0,
        Severity::Info | Severity::Pass => 0.0,
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let deductions = Severity::DESCENDING
            .into_iter()
            .map(|severity| (severity, default_deduction(severity)))
            .collect();
        Self {
            deductions,
            column_weights: BTreeMap::new(),
        }
    }
}

impl ScoringConfig {
    /// Points deducted for a finding at `severity`. Severities missing from
    /// a partial override keep their default.
    pub fn deduction(&self, severity: Severity) -> f64 {
        self.deductions
            .get(&severity)
            .copied()
            .unwrap_or_else(|| default_deduction(severity))
    }
}

/// Configuration for an audit run.
///
/// Use [`AuditConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use data_auditor::config::AuditConfig;
///
/// let config = AuditConfig::builder()
///     .disable_check("BENFORD_LAW")
///     .param("OUTLIER_ZSCORE", "z_threshold", 2.5)
///     .time_column("created_at")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Check identifiers that are never resolved.
    pub disabled_checks: BTreeSet<String>,

    /// Per-check severity-threshold table overrides.
    pub thresholds: BTreeMap<String, ThresholdTable>,

    /// Per-check numeric parameter overrides (e.g. z cutoff, similarity).
    pub params: BTreeMap<String, BTreeMap<String, f64>>,

    /// Severity forced onto failing findings of a check.
    pub severity_overrides: BTreeMap<String, Severity>,

    /// Deductions and column weights.
    pub scoring: ScoringConfig,

    /// Number of values sampled for pattern matching during classification.
    /// Default: 200
    pub classification_sample_size: usize,

    /// Row count above which costly checks run on a sample.
    /// Default: 100_000
    pub sampling_row_threshold: usize,

    /// Size of the stratified sample used by costly checks.
    /// Default: 20_000
    pub sample_size: usize,

    /// Seed for every sampling step.
    /// Default: 42
    pub seed: u64,

    /// Column ordering the dataset in time. If None, the first
    /// DATE/DATETIME column is used.
    pub time_column: Option<String>,

    /// "Now" for future-date checks. If None, the wall clock at auditor
    /// construction is used.
    pub reference_time: Option<NaiveDateTime>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            disabled_checks: BTreeSet::new(),
            thresholds: BTreeMap::new(),
            params: BTreeMap::new(),
            severity_overrides: BTreeMap::new(),
            scoring: ScoringConfig::default(),
            classification_sample_size: 200,
            sampling_row_threshold: 100_000,
            sample_size: 20_000,
            seed: 42,
            time_column: None,
            reference_time: None,
        }
    }
}

impl AuditConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder::default()
    }

    /// Load configuration overrides from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AuditConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_disabled(&self, check_id: &str) -> bool {
        self.disabled_checks.contains(check_id)
    }

    /// Numeric parameter override for a check, if any.
    pub fn param(&self, check_id: &str, name: &str) -> Option<f64> {
        self.params.get(check_id).and_then(|p| p.get(name)).copied()
    }

    /// Validate the shape of every override and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (check_id, table) in &self.thresholds {
            table
                .validate()
                .map_err(|reason| ConfigValidationError::InvalidThresholdTable {
                    check_id: check_id.clone(),
                    reason,
                })?;
        }

        for (check_id, params) in &self.params {
            for (name, value) in params {
                if !value.is_finite() {
                    return Err(ConfigValidationError::InvalidParameter {
                        check_id: check_id.clone(),
                        name: name.clone(),
                        reason: format!("{} is not a finite number", value),
                    });
                }
            }
        }

        for (severity, points) in &self.scoring.deductions {
            if !points.is_finite() || *points < 0.0 || *points > 100.0 {
                return Err(ConfigValidationError::InvalidDeduction {
                    severity: *severity,
                    value: *points,
                });
            }
        }

        for (column, weight) in &self.scoring.column_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigValidationError::InvalidWeight {
                    column: column.clone(),
                    value: *weight,
                });
            }
        }

        if self.classification_sample_size == 0 {
            return Err(ConfigValidationError::InvalidSampling(
                "classification_sample_size must be at least 1".to_string(),
            ));
        }

        if self.sample_size == 0 || self.sample_size > self.sampling_row_threshold {
            return Err(ConfigValidationError::InvalidSampling(format!(
                "sample_size {} must be between 1 and sampling_row_threshold {}",
                self.sample_size, self.sampling_row_threshold
            )));
        }

        Ok(())
    }

    /// Validate shapes and reject overrides naming checks or parameters the
    /// registry does not know.
    pub fn validate_against(&self, registry: &CheckRegistry) -> Result<(), ConfigValidationError> {
        self.validate()?;

        let referenced = self
            .disabled_checks
            .iter()
            .chain(self.thresholds.keys())
            .chain(self.params.keys())
            .chain(self.severity_overrides.keys());

        for check_id in referenced {
            if registry.definition(check_id).is_none() {
                return Err(ConfigValidationError::UnknownCheck(check_id.clone()));
            }
        }

        for check_id in self.thresholds.keys() {
            if registry.definition(check_id).is_some_and(|d| d.thresholds.is_empty()) {
                return Err(ConfigValidationError::InvalidThresholdTable {
                    check_id: check_id.clone(),
                    reason: "check does not grade against a threshold table".to_string(),
                });
            }
        }

        for (check_id, params) in &self.params {
            let Some(definition) = registry.definition(check_id) else {
                continue;
            };
            for name in params.keys() {
                if definition.default_param(name).is_none() {
                    return Err(ConfigValidationError::InvalidParameter {
                        check_id: check_id.clone(),
                        name: name.clone(),
                        reason: "unknown parameter".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Unknown check identifier '{0}'")]
    UnknownCheck(String),

    #[error("Invalid threshold table for '{check_id}': {reason}")]
    InvalidThresholdTable { check_id: String, reason: String },

    #[error("Invalid parameter '{name}' for '{check_id}': {reason}")]
    InvalidParameter {
        check_id: String,
        name: String,
        reason: String,
    },

    #[error("Invalid deduction for {severity}: {value} (must be between 0 and 100)")]
    InvalidDeduction { severity: Severity, value: f64 },

    #[error("Invalid weight for column '{column}': {value} (must be non-negative)")]
    InvalidWeight { column: String, value: f64 },

    #[error("Invalid sampling configuration: {0}")]
    InvalidSampling(String),
}

/// Builder for [`AuditConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    /// Never resolve the given check.
    pub fn disable_check(mut self, check_id: impl Into<String>) -> Self {
        self.config.disabled_checks.insert(check_id.into());
        self
    }

    /// Replace a check's severity-threshold table.
    pub fn threshold_table(mut self, check_id: impl Into<String>, table: ThresholdTable) -> Self {
        self.config.thresholds.insert(check_id.into(), table);
        self
    }

    /// Override one numeric parameter of a check.
    pub fn param(
        mut self,
        check_id: impl Into<String>,
        name: impl Into<String>,
        value: f64,
    ) -> Self {
        self.config
            .params
            .entry(check_id.into())
            .or_default()
            .insert(name.into(), value);
        self
    }

    /// Force the severity of a check's failing findings.
    pub fn severity_override(mut self, check_id: impl Into<String>, severity: Severity) -> Self {
        self.config.severity_overrides.insert(check_id.into(), severity);
        self
    }

    /// Set the points deducted per finding at `severity`.
    pub fn deduction(mut self, severity: Severity, points: f64) -> Self {
        self.config.scoring.deductions.insert(severity, points);
        self
    }

    /// Give a column an explicit weight in the dataset score.
    pub fn column_weight(mut self, column: impl Into<String>, weight: f64) -> Self {
        self.config.scoring.column_weights.insert(column.into(), weight);
        self
    }

    pub fn classification_sample_size(mut self, size: usize) -> Self {
        self.config.classification_sample_size = size;
        self
    }

    pub fn sampling_row_threshold(mut self, rows: usize) -> Self {
        self.config.sampling_row_threshold = rows;
        self
    }

    pub fn sample_size(mut self, size: usize) -> Self {
        self.config.sample_size = size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Designate the column that orders rows in time.
    pub fn time_column(mut self, column: impl Into<String>) -> Self {
        self.config.time_column = Some(column.into());
        self
    }

    /// Pin "now" for future-date checks.
    pub fn reference_time(mut self, time: NaiveDateTime) -> Self {
        self.config.reference_time = Some(time);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AuditConfig` or an error if validation fails.
    /// Unknown check identifiers are caught later, by
    /// [`AuditConfig::validate_against`].
    pub fn build(self) -> Result<AuditConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
