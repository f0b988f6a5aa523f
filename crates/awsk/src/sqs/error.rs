//! SQS error mapping.

use std::fmt::Debug;

use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use awsk_core::CoreError;

/// Map any SQS SDK error to `CoreError::Transport`.
pub fn map_sqs_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> CoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let message = match err.code() {
        Some("AWS.SimpleQueueService.NonExistentQueue") | Some("QueueDoesNotExist") => {
            "Queue does not exist".to_string()
        }
        Some("RequestThrottled") | Some("ThrottlingException") => {
            "Request throttled, please retry".to_string()
        }
        Some("AccessDenied") | Some("AccessDeniedException") => {
            "Access denied for the given credentials".to_string()
        }
        _ => DisplayErrorContext(&err).to_string(),
    };
    CoreError::transport(operation, message)
}
