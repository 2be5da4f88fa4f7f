//! Progress reporting for an audit run.
//!
//! The auditor reports a [`ProgressUpdate`] at every stage boundary and once
//! per column while checks run. Reporters receive updates on the thread
//! running the audit.
//!
//! # Example
//!
//! ```rust,ignore
//! use data_auditor::Auditor;
//!
//! let report = Auditor::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .audit(&dataset)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of an audit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStage {
    /// Validating configuration and resolving the time column
    Initializing,
    /// Building column profiles
    Profiling,
    /// Assigning a semantic type to every column
    Classification,
    /// Running the per-column checks
    ColumnChecks,
    /// Running the dataset-wide checks
    DatasetChecks,
    /// Aggregating findings into scores
    Scoring,
    /// Audit completed successfully
    Complete,
    /// Audit failed with an error
    Failed,
}

impl AuditStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Profiling => "Profiling Columns",
            Self::Classification => "Classifying Columns",
            Self::ColumnChecks => "Running Column Checks",
            Self::DatasetChecks => "Running Dataset Checks",
            Self::Scoring => "Scoring",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run spent in this stage. The working stages sum
    /// to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::Profiling => 0.10,
            Self::Classification => 0.08,
            Self::ColumnChecks => 0.55,
            Self::DatasetChecks => 0.20,
            Self::Scoring => 0.05,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Profiling => 0.02,
            Self::Classification => 0.12,
            Self::ColumnChecks => 0.20,
            Self::DatasetChecks => 0.75,
            Self::Scoring => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// Progress update with optional sub-stage and item counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: AuditStage,

    /// Optional sub-stage description (e.g., "Column: amount")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(stage: AuditStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            sub_stage: None,
            progress: (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    pub fn with_sub_stage(
        stage: AuditStage,
        sub_stage: impl Into<String>,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sub_stage: Some(sub_stage.into()),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Progress through `current` of `total` items of a stage.
    pub fn with_items(
        stage: AuditStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::with_sub_stage(stage, sub_stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(AuditStage::Complete, 1.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            progress: 0.0,
            stage_progress: 0.0,
            ..Self::new(AuditStage::Failed, 0.0, message)
        }
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

/// Receives progress updates during an audit.
///
/// # Example
///
/// ```rust,ignore
/// use data_auditor::{ProgressReporter, ProgressUpdate};
///
/// struct LogReporter;
///
/// impl ProgressReporter for LogReporter {
///     fn report(&self, update: ProgressUpdate) {
///         tracing::debug!(stage = ?update.stage, "{}", update.message);
///     }
/// }
/// ```
pub trait ProgressReporter: Send + Sync {
    /// Called at stage boundaries and once per audited column. Keep it
    /// cheap and non-blocking.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(AuditStage::Profiling, 0.5, "Profiling...");
        assert_eq!(update.stage, AuditStage::Profiling);
        assert!(update.sub_stage.is_none());
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.07).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_with_items() {
        let update = ProgressUpdate::with_items(
            AuditStage::ColumnChecks,
            "Column: amount",
            5,
            10,
            "Checking amount",
        );
        assert_eq!(update.sub_stage, Some("Column: amount".to_string()));
        assert_eq!(update.stage_progress, 0.5);
        assert_eq!(update.items_processed, Some(5));
        assert_eq!(update.items_total, Some(10));
    }

    #[test]
    fn test_progress_update_terminal_states() {
        let done = ProgressUpdate::complete("Done");
        assert_eq!(done.stage, AuditStage::Complete);
        assert_eq!(done.progress, 1.0);

        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, AuditStage::Failed);
        assert_eq!(failed.progress, 0.0);
    }

    #[test]
    fn test_stage_weights_sum() {
        let stages = [
            AuditStage::Initializing,
            AuditStage::Profiling,
            AuditStage::Classification,
            AuditStage::ColumnChecks,
            AuditStage::DatasetChecks,
            AuditStage::Scoring,
        ];
        let total: f32 = stages.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 0.01, "Weights should sum to ~1.0");

        // each stage starts where the previous one ends
        for pair in stages.windows(2) {
            let end = pair[0].base_progress() + pair[0].weight();
            assert!((end - pair[1].base_progress()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stage_json_values() {
        let json = serde_json::to_string(&AuditStage::ColumnChecks).unwrap();
        assert_eq!(json, "\"column_checks\"");
        let update = ProgressUpdate::new(AuditStage::Scoring, 0.0, "x");
        let json = serde_json::to_string(&update).unwrap();
        assert!(!json.contains("sub_stage"));
    }

    #[test]
    fn test_closure_progress_reporter_across_threads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let reporter_clone = reporter.clone();
        std::thread::spawn(move || {
            reporter_clone.report(ProgressUpdate::new(AuditStage::Profiling, 0.5, "bg"));
        })
        .join()
        .expect("Thread should not panic");
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
