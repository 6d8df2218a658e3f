//! Errors raised by the bulk marshaller

use std::time::Duration;

use arraybind_core::{ArraybindError, DbType};
use thiserror::Error;

/// Errors that can occur while marshalling or executing a bulk request.
///
/// Everything except `Execution` and `Timeout` is raised before the round trip.
#[derive(Debug, Error)]
pub enum BulkError {
    /// A placeholder has no matching field on the record type.
    #[error("no field matches placeholder '{placeholder}' on {record}")]
    FieldNotFound {
        placeholder: String,
        record: &'static str,
    },

    /// The field's kind has no database type mapping.
    #[error("field '{field}' has unsupported type {type_name}")]
    UnsupportedType {
        field: String,
        type_name: &'static str,
    },

    /// The field is nullable but its underlying kind is unknown.
    #[error("cannot determine the underlying type of nullable field '{field}'")]
    IndeterminateType { field: String },

    /// A cell could not be converted to the field's database type.
    #[error("cannot convert row {row} of field '{field}' to {target}: {reason}")]
    Conversion {
        field: String,
        row: usize,
        target: DbType,
        reason: String,
    },

    /// A batch's arrays do not line up with the statement's placeholders.
    #[error("statement has {placeholders} placeholders but {arrays} arrays were attached")]
    ParameterCountMismatch { placeholders: usize, arrays: usize },

    /// An array's length differs from the batch's bind count.
    #[error("array '{field}' has {actual} rows, expected {expected}")]
    ArrayLengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// The driver-facing command could not be assembled.
    #[error("invalid bind command: {0}")]
    InvalidCommand(#[source] ArraybindError),

    /// The round trip failed.
    #[error("bulk execution failed: {0}")]
    Execution(#[source] ArraybindError),

    /// The round trip exceeded the configured time budget.
    #[error("bulk execution timed out after {0:?}")]
    Timeout(Duration),
}

impl BulkError {
    /// Whether the error was raised before anything was sent to the driver
    pub fn is_pre_execution(&self) -> bool {
        !matches!(self, BulkError::Execution(_) | BulkError::Timeout(_))
    }
}

/// Result type for bulk operations.
pub type BulkResult<T> = Result<T, BulkError>;
