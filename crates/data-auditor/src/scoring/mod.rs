//! Severity-weighted scoring.
//!
//! A column starts at 100 and loses a fixed number of points per failing
//! finding. The dataset score is the weighted mean of the column scores,
//! where more complete columns weigh more.

use std::collections::BTreeMap;

use crate::config::ScoringConfig;
use crate::types::{
    ColumnScore, DATASET_COLUMN, DatasetScore, Deduction, Finding, Grade, Severity, round_to,
};

const MAX_SCORE: f64 = 100.0;

/// Turns findings into column and dataset scores.
#[derive(Debug, Clone, Copy)]
pub struct ScoringAggregator<'c> {
    config: &'c ScoringConfig,
}

impl<'c> ScoringAggregator<'c> {
    pub fn new(config: &'c ScoringConfig) -> Self {
        Self { config }
    }

    /// Score one column from the findings attributed to it.
    pub fn score_column<'f>(
        &self,
        column: &str,
        findings: impl IntoIterator<Item = &'f Finding>,
    ) -> ColumnScore {
        let mut checks_run = 0;
        let mut issues_by_severity = BTreeMap::new();
        let mut deductions = Vec::new();

        for finding in findings {
            checks_run += 1;
            if !finding.severity.is_failing() {
                continue;
            }
            *issues_by_severity.entry(finding.severity).or_insert(0) += 1;
            deductions.push(Deduction {
                check_id: finding.check_id.clone(),
                severity: finding.severity,
                points: self.config.deduction(finding.severity),
            });
        }

        let lost: f64 = deductions.iter().map(|d| d.points).sum();
        let score = round_to((MAX_SCORE - lost).clamp(0.0, MAX_SCORE), 1);
        ColumnScore {
            column: column.to_string(),
            score,
            grade: Grade::from_score(score),
            checks_run,
            checks_failed: deductions.len(),
            issues_by_severity,
            deductions,
        }
    }

    /// Score every column present in `findings`, plus any `columns` that
    /// produced no findings at all.
    pub fn score_columns(
        &self,
        columns: &[&str],
        findings: &[Finding],
    ) -> BTreeMap<String, ColumnScore> {
        let mut grouped: BTreeMap<&str, Vec<&Finding>> =
            columns.iter().map(|c| (*c, Vec::new())).collect();
        for finding in findings {
            grouped.entry(finding.column.as_str()).or_default().push(finding);
        }
        grouped
            .into_iter()
            .map(|(column, findings)| (column.to_string(), self.score_column(column, findings)))
            .collect()
    }

    /// Weight of a column in the dataset mean.
    pub fn weight(&self, column: &str, null_rate: f64) -> f64 {
        if let Some(weight) = self.config.column_weights.get(column) {
            return *weight;
        }
        if column == DATASET_COLUMN {
            return 1.0;
        }
        1.0 / (1.0 + null_rate.clamp(0.0, 1.0))
    }

    /// Weighted mean of `column_scores`. Columns missing from `null_rates`
    /// count as complete. No columns scores 100; when every weight is zero
    /// the plain mean is used.
    pub fn dataset_score(
        &self,
        column_scores: &BTreeMap<String, ColumnScore>,
        null_rates: &BTreeMap<String, f64>,
    ) -> DatasetScore {
        let mut weights = BTreeMap::new();
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut checks_run = 0;
        let mut issues_by_severity: BTreeMap<Severity, usize> = BTreeMap::new();

        for (column, score) in column_scores {
            let weight = self.weight(column, null_rates.get(column).copied().unwrap_or(0.0));
            weighted_sum += score.score * weight;
            weight_total += weight;
            weights.insert(column.clone(), round_to(weight, 6));

            checks_run += score.checks_run;
            for (severity, count) in &score.issues_by_severity {
                *issues_by_severity.entry(*severity).or_insert(0) += count;
            }
        }

        // All weights overridden to zero: every column counts equally.
        let score = if column_scores.is_empty() {
            MAX_SCORE
        } else if weight_total > 0.0 {
            round_to(weighted_sum / weight_total, 1)
        } else {
            let sum: f64 = column_scores.values().map(|s| s.score).sum();
            round_to(sum / column_scores.len() as f64, 1)
        };
        DatasetScore {
            score,
            grade: Grade::from_score(score),
            columns_scored: column_scores.len(),
            checks_run,
            total_issues: issues_by_severity.values().sum(),
            issues_by_severity,
            weights,
        }
    }
}
