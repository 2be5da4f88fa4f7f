//! The auditor and its builder.
//!
//! [`Auditor`] ties the stages together: classification, per-column checks,
//! dataset-wide checks and scoring. It holds no per-run state, so one
//! auditor can audit many datasets, from several threads at once.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::checks::TimeIndex;
use crate::config::{AuditConfig, ConfigValidationError};
use crate::error::{Result, ResultExt};
use crate::pipeline::executor::{CheckExecutor, sort_findings};
use crate::pipeline::progress::{
    AuditStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::profiler::{Classification, DataProfiler, Dataset, TypeClassifier};
use crate::registry::CheckRegistry;
use crate::scoring::ScoringAggregator;
use crate::types::{ColumnScore, DATASET_COLUMN, DatasetScore, Finding, Severity};

/// Everything one audit produced. This is the contract every report format
/// renders from.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub row_count: usize,
    pub column_count: usize,
    pub reference_time: NaiveDateTime,
    /// Column the temporal checks ordered rows by, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_column: Option<String>,
    pub classifications: Vec<Classification>,
    /// Sorted by column, then check id.
    pub findings: Vec<Finding>,
    pub column_scores: BTreeMap<String, ColumnScore>,
    pub dataset_score: DatasetScore,
}

impl AuditReport {
    /// Worst severity across all findings; `Pass` when there are none.
    pub fn max_severity(&self) -> Severity {
        self.findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Pass)
    }

    /// Process exit code: 0 clean, 1 issues, 2 critical issues.
    pub fn exit_code(&self) -> i32 {
        match self.max_severity() {
            Severity::Critical => 2,
            severity if severity.is_failing() => 1,
            _ => 0,
        }
    }

    /// Findings that count against the score.
    pub fn issues(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity.is_failing())
    }

    pub fn findings_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.findings.iter().filter(move |f| f.column == column)
    }
}

/// The data quality auditor.
///
/// Use [`Auditor::builder()`] to create one with a custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use data_auditor::{AuditConfig, Auditor};
///
/// let auditor = Auditor::builder()
///     .config(AuditConfig::builder().disable_check("BENFORD_LAW").build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?;
///
/// let report = auditor.audit_dataframe(&df)?;
/// std::process::exit(report.exit_code());
/// ```
pub struct Auditor {
    config: AuditConfig,
    registry: &'static CheckRegistry,
    reference_time: NaiveDateTime,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(Auditor: Send, Sync);

impl Auditor {
    pub fn builder() -> AuditorBuilder {
        AuditorBuilder::default()
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn reference_time(&self) -> NaiveDateTime {
        self.reference_time
    }

    /// Profile a polars frame and audit it.
    pub fn audit_dataframe(&self, df: &DataFrame) -> Result<AuditReport> {
        self.report_progress(ProgressUpdate::new(
            AuditStage::Profiling,
            0.0,
            "Profiling columns...",
        ));
        let dataset = DataProfiler::profile_dataframe(df).context("Failed to profile DataFrame")?;
        self.audit(&dataset)
    }

    /// Audit already profiled columns.
    pub fn audit(&self, dataset: &Dataset) -> Result<AuditReport> {
        self.audit_with_external(dataset, Vec::new())
    }

    /// Audit and merge findings produced elsewhere (business rules, for
    /// example) before scoring.
    pub fn audit_with_external(
        &self,
        dataset: &Dataset,
        external: Vec<Finding>,
    ) -> Result<AuditReport> {
        match self.audit_internal(dataset, external) {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Audit complete: score {} ({})",
                    report.dataset_score.score, report.dataset_score.grade
                )));
                Ok(report)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Audit error: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn audit_internal(&self, dataset: &Dataset, external: Vec<Finding>) -> Result<AuditReport> {
        let start_time = Instant::now();
        info!(
            "Starting audit: {} rows, {} columns",
            dataset.row_count(),
            dataset.column_count()
        );
        self.report_progress(ProgressUpdate::new(
            AuditStage::Initializing,
            0.0,
            "Starting audit...",
        ));

        // Classification
        let classifications = self.classify(dataset);
        let time_column = self.config.time_column.as_deref();
        let time_index = TimeIndex::build(dataset, &classifications, time_column)
            .context("While resolving the time column")?;
        if let Some(index) = &time_index {
            debug!("Temporal checks ordered by '{}'", index.column);
        }

        // Column checks
        let executor = CheckExecutor::new(self.registry, &self.config, self.reference_time);
        let total = dataset.column_count();
        let mut findings = Vec::new();
        for (position, profile) in dataset.columns().iter().enumerate() {
            self.report_progress(ProgressUpdate::with_items(
                AuditStage::ColumnChecks,
                format!("Column: {}", profile.name()),
                position,
                total,
                format!("Checking '{}'", profile.name()),
            ));
            findings.extend(executor.run_column(dataset, &classifications, position));
        }

        // Dataset checks
        self.report_progress(ProgressUpdate::new(
            AuditStage::DatasetChecks,
            0.0,
            "Running dataset-wide checks...",
        ));
        findings.extend(executor.run_dataset(dataset, &classifications, time_index.as_ref()));

        if !external.is_empty() {
            debug!("Merging {} external findings", external.len());
            findings.extend(external);
        }
        sort_findings(&mut findings);

        // Scoring
        self.report_progress(ProgressUpdate::new(AuditStage::Scoring, 0.0, "Scoring..."));
        let scorer = ScoringAggregator::new(&self.config.scoring);
        let mut names: Vec<&str> = dataset.columns().iter().map(|c| c.name()).collect();
        names.push(DATASET_COLUMN);
        let column_scores = scorer.score_columns(&names, &findings);
        let null_rates: BTreeMap<String, f64> = dataset
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.null_ratio()))
            .collect();
        let dataset_score = scorer.dataset_score(&column_scores, &null_rates);

        info!(
            "Audit finished in {:.2?}: {} findings, {} issues, score {} ({})",
            start_time.elapsed(),
            findings.len(),
            dataset_score.total_issues,
            dataset_score.score,
            dataset_score.grade
        );

        Ok(AuditReport {
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            reference_time: self.reference_time,
            time_column: time_index.map(|index| index.column),
            classifications,
            findings,
            column_scores,
            dataset_score,
        })
    }

    fn classify(&self, dataset: &Dataset) -> Vec<Classification> {
        self.report_progress(ProgressUpdate::new(
            AuditStage::Classification,
            0.0,
            "Classifying columns...",
        ));
        let classifier = TypeClassifier::from_config(&self.config);
        dataset
            .columns()
            .iter()
            .map(|profile| classifier.classify(profile))
            .collect()
    }
}

/// Builder for creating an [`Auditor`].
#[derive(Default)]
pub struct AuditorBuilder {
    config: Option<AuditConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(AuditorBuilder: Send);

impl AuditorBuilder {
    pub fn config(mut self, config: AuditConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during an audit.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the auditor.
    ///
    /// Returns an error if the configuration is malformed or names checks
    /// or parameters the built-in registry does not know.
    pub fn build(self) -> std::result::Result<Auditor, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        let registry = CheckRegistry::builtin();
        config.validate_against(registry)?;

        let reference_time = config
            .reference_time
            .unwrap_or_else(|| chrono::Local::now().naive_local());

        Ok(Auditor {
            config,
            registry,
            reference_time,
            progress_reporter: self.progress_reporter,
        })
    }
}
