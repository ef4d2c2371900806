//! Custom error types for the cleaning pipeline.
//!
//! This module provides the error hierarchy used by every cleaning stage,
//! built on `thiserror`.
//!
//! Errors are serializable as `{ code, message }` so they can be embedded in
//! JSON reports next to successful results.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Pipeline was cancelled by user.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// One or more required columns are absent.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A call-time parameter is out of its valid range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A stage needs numeric columns but the dataset has none.
    #[error("No numeric columns available for {0}")]
    NoNumericColumns(String),

    /// Numeric columns exist but hold nothing a stage can work from.
    #[error("Degenerate data: {0}")]
    DegenerateData(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

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
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for [`ProcessingError::InvalidParameter`].
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ProcessingError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code for report consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::MissingColumns(_) => "MISSING_COLUMNS",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::NoNumericColumns(_) => "NO_NUMERIC_COLUMNS",
            Self::DegenerateData(_) => "DEGENERATE_DATA",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if this error was caused by the caller's input rather than the data.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_)
            | Self::MissingColumns(_)
            | Self::InvalidParameter { .. }
            | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

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
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}
