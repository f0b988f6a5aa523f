use thiserror::Error;

use crate::batch::WriteRequest;
use crate::queue::TerminalCause;

/// Input that fails validation before or while a bulk operation runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Record is missing key attribute '{attribute}'")]
    MissingKeyAttribute { attribute: String },
    #[error("Key attribute '{attribute}' is not of type {expected}")]
    KeyTypeMismatch {
        attribute: String,
        expected: &'static str,
    },
    #[error("Unsupported key attribute type {attribute_type} for '{attribute}'")]
    UnsupportedKeyType {
        attribute: String,
        attribute_type: String,
    },
    #[error("Invalid key schema: {0}")]
    InvalidKeySchema(String),
    #[error("Unsupported type {data_type} for message attribute '{name}'")]
    UnsupportedAttributeType { name: String, data_type: String },
    #[error("Invalid value for message attribute '{name}': {reason}")]
    InvalidAttributeValue { name: String, reason: String },
    #[error("Invalid value for partition key '{attribute}': {reason}")]
    InvalidPartitionValue { attribute: String, reason: String },
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),
}

/// Errors raised by the core operations and the provider adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
    #[error("{} of {attempted} items were not processed", unprocessed.len())]
    PartialBatchFailure {
        attempted: usize,
        unprocessed: Vec<WriteRequest>,
    },
    #[error("Conversion error: {0}")]
    Conversion(String),
    #[error("Operation cancelled")]
    Cancelled,
}

impl CoreError {
    /// Shorthand for a failed service call.
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            message: message.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// A bulk table operation that failed part way.
///
/// `processed` counts the items whose bulk call was acknowledged before the
/// failure aborted the operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{error} ({processed} items processed)")]
pub struct BulkFailure {
    pub processed: usize,
    #[source]
    pub error: CoreError,
}

impl BulkFailure {
    /// Failure that happened before anything was written.
    pub fn before_start(error: impl Into<CoreError>) -> Self {
        Self {
            processed: 0,
            error: error.into(),
        }
    }
}

/// A drain that ended on an error-class terminal cause.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Drain failed after forwarding {forwarded} messages: {cause}")]
pub struct DrainFailure {
    pub cause: TerminalCause,
    pub forwarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_attribute_display() {
        let error = ValidationError::MissingKeyAttribute {
            attribute: "id".to_string(),
        };
        assert_eq!(error.to_string(), "Record is missing key attribute 'id'");
    }

    #[test]
    fn test_transport_display() {
        let error = CoreError::transport("Scan", "table not found");
        assert_eq!(error.to_string(), "Scan failed: table not found");
    }

    #[test]
    fn test_validation_is_transparent() {
        let error: CoreError = ValidationError::MissingInput("table name").into();
        assert_eq!(error.to_string(), "Missing required input: table name");
    }

    #[test]
    fn test_bulk_failure_display_includes_processed() {
        let failure = BulkFailure {
            processed: 50,
            error: CoreError::transport("BatchWriteItem", "throughput exceeded"),
        };
        assert_eq!(
            failure.to_string(),
            "BatchWriteItem failed: throughput exceeded (50 items processed)"
        );
    }

    #[test]
    fn test_before_start_has_zero_processed() {
        let failure = BulkFailure::before_start(ValidationError::MissingInput("key schema"));
        assert_eq!(failure.processed, 0);
    }
}
