//! Check execution.
//!
//! Runs resolved checks against columns and the whole dataset. Every check
//! invocation is isolated: an error or a panic becomes an `INFO` finding and
//! the remaining checks still run.

use std::panic::{AssertUnwindSafe, catch_unwind};

use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::checks::{CheckContext, DatasetContext, TimeIndex};
use crate::config::AuditConfig;
use crate::error::{CheckError, CheckResult};
use crate::pipeline::sampling::stratified_indices;
use crate::profiler::{Classification, ColumnProfile, Dataset};
use crate::registry::{CheckKind, CheckRegistry, ResolvedCheck};
use crate::types::{DATASET_COLUMN, Finding, Severity};

/// Pseudo-check reporting that sampling changed a column's type.
pub const CLASSIFICATION_SAMPLING: &str = "CLASSIFICATION_SAMPLING";

/// Runs checks from a registry under one configuration.
pub struct CheckExecutor<'a> {
    registry: &'a CheckRegistry,
    config: &'a AuditConfig,
    reference_time: NaiveDateTime,
}

impl<'a> CheckExecutor<'a> {
    pub fn new(
        registry: &'a CheckRegistry,
        config: &'a AuditConfig,
        reference_time: NaiveDateTime,
    ) -> Self {
        Self {
            registry,
            config,
            reference_time,
        }
    }

    /// Run every applicable check on the column at `position`.
    pub fn run_column(
        &self,
        dataset: &Dataset,
        classifications: &[Classification],
        position: usize,
    ) -> Vec<Finding> {
        let profile = &dataset.columns()[position];
        let classification = &classifications[position];
        let checks = self
            .registry
            .applicable_checks(classification.semantic_type, self.config);
        debug!(
            "Column '{}' ({}): {} checks",
            profile.name(),
            classification.semantic_type,
            checks.len()
        );

        let mut findings = Vec::with_capacity(checks.len() + 1);
        if let Some(finding) = classification_sampling_finding(classification) {
            findings.push(finding);
        }

        let gate = OnceCell::new();
        let mut sample: Option<ColumnProfile> = None;
        let rows = dataset.row_count();
        let sampled = rows > self.config.sampling_row_threshold;

        for check in &checks {
            let CheckKind::Column(run) = check.definition.kind else {
                continue;
            };
            let use_sample = sampled && check.definition.costly;
            let target = if use_sample {
                sample.get_or_insert_with(|| {
                    info!(
                        "Column '{}': {} rows exceed {}, sampling {} rows for costly checks",
                        profile.name(),
                        rows,
                        self.config.sampling_row_threshold,
                        self.config.sample_size
                    );
                    let rows = stratified_indices(rows, self.config.sample_size, self.config.seed);
                    profile.subset(&rows)
                })
            } else {
                profile
            };

            let ctx = CheckContext {
                profile: target,
                full_profile: profile,
                classification,
                check,
                dataset,
                classifications,
                gate: &gate,
                reference_time: self.reference_time,
                seed: self.config.seed,
            };
            let finding = match isolate(|| run(&ctx)) {
                Ok(finding) => finding,
                Err(error) => failure_finding(check.id(), profile.name(), &error),
            };
            let finding = if use_sample {
                let size = target.len();
                finding
                    .with_meta("sampled", true)
                    .with_meta("sample_size", size)
                    .with_meta("sample_rate", size as f64 / rows as f64)
            } else {
                finding
            };
            findings.push(apply_override(finding, check));
        }
        findings
    }

    /// Run every dataset-wide check, each in isolation.
    pub fn run_dataset(
        &self,
        dataset: &Dataset,
        classifications: &[Classification],
        time_index: Option<&TimeIndex>,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();
        for check in self.registry.dataset_checks(self.config) {
            let CheckKind::Dataset(run) = check.definition.kind else {
                continue;
            };
            let ctx = DatasetContext {
                dataset,
                classifications,
                check: &check,
                time_index,
                seed: self.config.seed,
            };
            match isolate(|| run(&ctx)) {
                Ok(produced) => {
                    findings.extend(produced.into_iter().map(|f| apply_override(f, &check)));
                }
                Err(error) => findings.push(failure_finding(check.id(), DATASET_COLUMN, &error)),
            }
        }
        findings
    }
}

/// Run `check`, turning a panic into [`CheckError::Panicked`].
fn isolate<T>(check: impl FnOnce() -> CheckResult<T>) -> CheckResult<T> {
    match catch_unwind(AssertUnwindSafe(check)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(CheckError::Panicked(message))
        }
    }
}

/// The `INFO` finding recorded in place of a failed check.
pub fn failure_finding(check_id: &str, column: &str, error: &CheckError) -> Finding {
    warn!("Check {} failed on '{}': {}", check_id, column, error);
    Finding::info(check_id, column, format!("Check failed: {}", error))
        .with_meta("error", true)
        .with_meta("error_type", error.error_type())
}

fn apply_override(finding: Finding, check: &ResolvedCheck<'_>) -> Finding {
    match check.severity_override {
        Some(severity) if finding.severity.is_failing() && finding.severity != severity => {
            let original = finding.severity;
            finding
                .with_severity(severity)
                .with_meta("original_severity", original.as_str())
        }
        _ => finding,
    }
}

fn classification_sampling_finding(classification: &Classification) -> Option<Finding> {
    if !classification.sampling_changed_outcome {
        return None;
    }
    let full = classification.full_column_type?;
    Some(
        Finding::new(
            CLASSIFICATION_SAMPLING,
            classification.column.as_str(),
            Severity::Info,
            format!(
                "classified as {} from a sample of {}; the full column looks like {}",
                classification.semantic_type, classification.sample_size, full
            ),
        )
        .with_meta("sampled_type", classification.semantic_type.as_str())
        .with_meta("full_column_type", full.as_str())
        .with_meta("sample_size", classification.sample_size),
    )
}

/// Deterministic output order: by column, then check id. Findings of the
/// same check keep the order the check produced them in.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
