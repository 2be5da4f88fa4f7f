//! Schema-free data quality auditor.
//!
//! Point it at a table of unknown shape and it works out what each column
//! holds, runs the statistical checks that make sense for that kind of
//! column, and grades every column and the dataset as a whole.
//!
//! # Overview
//!
//! - **Profiling**: raw text and typed views of every column, with derived
//!   statistics ([`profiler`])
//! - **Classification**: one of 13 semantic types per column, decided by a
//!   fixed-order rule list ([`TypeClassifier`])
//! - **Checks**: a frozen registry maps each type to its checks
//!   ([`CheckRegistry`]); dataset-wide checks cover correlation, missingness
//!   structure, personal data and time behaviour
//! - **Execution**: failures inside a check become `INFO` findings and never
//!   abort a run; costly checks sample large inputs ([`CheckExecutor`])
//! - **Scoring**: severity deductions per column and a completeness-weighted
//!   dataset score ([`ScoringAggregator`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use data_auditor::{AuditConfig, Auditor};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .try_into_reader_with_file_path(Some("orders.csv".into()))?
//!     .finish()?;
//!
//! let report = Auditor::builder()
//!     .config(AuditConfig::builder().time_column("created_at").build()?)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .audit_dataframe(&df)?;
//!
//! println!("score {} ({})", report.dataset_score.score, report.dataset_score.grade);
//! for finding in report.issues() {
//!     println!("{} {}: {}", finding.severity, finding.column, finding.message);
//! }
//! ```
//!
//! # Configuration
//!
//! Checks can be disabled, their thresholds and parameters overridden, and
//! their severity forced, either with [`AuditConfig::builder()`] or from a
//! JSON file:
//!
//! ```rust,ignore
//! use data_auditor::config::AuditConfig;
//! use data_auditor::registry::ThresholdTable;
//! use data_auditor::types::Severity;
//!
//! let config = AuditConfig::builder()
//!     .disable_check("BENFORD_LAW")
//!     .param("TYPO_CANDIDATES", "similarity_threshold", 0.9)
//!     .threshold_table("NULL_RATE", ThresholdTable::new(vec![(0.3, Severity::Critical)]))
//!     .deduction(Severity::Low, 1.0)
//!     .seed(7)
//!     .build()?;
//! ```

pub mod checks;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod profiler;
pub mod registry;
pub mod scoring;
pub mod stats;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{AuditConfig, AuditConfigBuilder, ConfigValidationError, ScoringConfig};
pub use error::{AuditError, CheckError, Result as AuditResult, ResultExt};
pub use pipeline::{
    AuditReport, AuditStage, Auditor, AuditorBuilder, CheckExecutor, ClosureProgressReporter,
    ProgressReporter, ProgressUpdate,
};
pub use profiler::{Classification, ColumnProfile, DataProfiler, Dataset, TypeClassifier, load_csv};
pub use registry::{CheckDefinition, CheckRegistry, ResolvedCheck, ThresholdTable};
pub use scoring::ScoringAggregator;
pub use types::{
    ColumnScore, DATASET_COLUMN, DatasetScore, Finding, Grade, SemanticType, Severity,
};
