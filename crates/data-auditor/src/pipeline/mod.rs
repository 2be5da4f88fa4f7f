//! Audit pipeline.
//!
//! The auditor, the check executor, progress reporting and the seeded
//! sampling they share.

mod builder;
pub mod executor;
pub mod progress;
pub mod sampling;

pub use builder::{AuditReport, Auditor, AuditorBuilder};
pub use executor::{CLASSIFICATION_SAMPLING, CheckExecutor};
pub use progress::{AuditStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate};
