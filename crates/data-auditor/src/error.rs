//! Error types for the data quality auditor.
//!
//! Two layers of errors live here:
//!
//! - [`AuditError`] covers failures of the run itself (bad configuration,
//!   unreadable input, no columns at all). These propagate to the caller.
//! - [`CheckError`] covers failures inside a single check. These never
//!   propagate: the check executor turns them into `INFO` findings.
//!
//! Errors are serializable so they can be embedded in JSON reports.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for an audit run.
#[derive(Error, Debug)]
pub enum AuditError {
    /// No column profiles were supplied, so there is nothing to audit.
    #[error("Dataset has no columns to audit")]
    NoColumns,

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Configuration was rejected before check resolution.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// Building column profiles failed.
    #[error("Failed to profile dataset: {0}")]
    ProfilingFailed(String),

    /// Internal error (e.g., inconsistent column lengths).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AuditError>,
    },
}

impl AuditError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AuditError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for machine consumers of the report.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoColumns => "NO_COLUMNS",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ProfilingFailed(_) => "PROFILING_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is recoverable by fixing the input or configuration.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidConfig(_) | Self::ColumnNotFound(_) | Self::NoColumns => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AuditError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AuditError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AuditError::Polars(e).with_context(context))
    }
}

/// A failure inside a single check implementation.
///
/// Check functions return `Result<Finding, CheckError>`; the executor is the
/// only place that converts the error side into a finding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    /// The check needs a column that is not part of the dataset.
    #[error("column '{0}' is not available")]
    MissingColumn(String),

    /// A numeric routine could not produce a result.
    #[error("{0}")]
    Computation(String),

    /// The check panicked; the payload message is preserved.
    #[error("check panicked: {0}")]
    Panicked(String),
}

impl CheckError {
    /// Short type name recorded in the failure finding's metadata.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MissingColumn(_) => "MissingColumn",
            Self::Computation(_) => "Computation",
            Self::Panicked(_) => "Panicked",
        }
    }

    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation(message.into())
    }
}

/// Result type for check implementations.
pub type CheckResult<T> = std::result::Result<T, CheckError>;
