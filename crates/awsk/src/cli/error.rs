//! Error types for the command line.

use awsk_core::{BulkFailure, CoreError, DrainFailure, ValidationError};
use thiserror::Error;

/// Result type alias for the command handlers.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors a command can end with.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Bulk operation failed: {0}")]
    Bulk(#[from] BulkFailure),

    #[error(transparent)]
    Drain(#[from] DrainFailure),

    #[error("Operation cancelled by user, pass --yes to confirm")]
    UserCancelled,
}

impl From<ValidationError> for CliError {
    fn from(error: ValidationError) -> Self {
        Self::Core(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_failure_keeps_processed_count() {
        let error = CliError::from(BulkFailure {
            processed: 50,
            error: CoreError::transport("BatchWriteItem", "throttled"),
        });

        assert_eq!(
            error.to_string(),
            "Bulk operation failed: BatchWriteItem failed: throttled (50 items processed)"
        );
    }
}
