//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `CoreError::Transport`.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::list_tables::ListTablesError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use awsk_core::CoreError;

const THROUGHPUT_EXCEEDED: &str = "Throughput exceeded, please retry";
const REQUEST_LIMIT_EXCEEDED: &str = "Request limit exceeded, please retry";
const INTERNAL_SERVER_ERROR: &str = "DynamoDB internal server error";

/// Map a Scan SDK error to CoreError.
pub fn map_scan_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<ScanError, R>,
    table_name: &str,
) -> CoreError {
    let message = match err.into_service_error() {
        ScanError::ResourceNotFoundException(_) => format!("Table '{table_name}' not found"),
        ScanError::ProvisionedThroughputExceededException(_) => THROUGHPUT_EXCEEDED.to_string(),
        ScanError::RequestLimitExceeded(_) => REQUEST_LIMIT_EXCEEDED.to_string(),
        ScanError::InternalServerError(_) => INTERNAL_SERVER_ERROR.to_string(),
        err => DisplayErrorContext(&err).to_string(),
    };
    CoreError::transport("Scan", message)
}

/// Map a Query SDK error to CoreError.
pub fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
    table_name: &str,
) -> CoreError {
    let message = match err.into_service_error() {
        QueryError::ResourceNotFoundException(_) => format!("Table '{table_name}' not found"),
        QueryError::ProvisionedThroughputExceededException(_) => THROUGHPUT_EXCEEDED.to_string(),
        QueryError::RequestLimitExceeded(_) => REQUEST_LIMIT_EXCEEDED.to_string(),
        QueryError::InternalServerError(_) => INTERNAL_SERVER_ERROR.to_string(),
        err => DisplayErrorContext(&err).to_string(),
    };
    CoreError::transport("Query", message)
}

/// Map a BatchWriteItem SDK error to CoreError.
pub fn map_batch_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<BatchWriteItemError, R>,
    table_name: &str,
) -> CoreError {
    let message = match err.into_service_error() {
        BatchWriteItemError::ResourceNotFoundException(_) => {
            format!("Table '{table_name}' not found")
        }
        BatchWriteItemError::ProvisionedThroughputExceededException(_) => {
            THROUGHPUT_EXCEEDED.to_string()
        }
        BatchWriteItemError::RequestLimitExceeded(_) => REQUEST_LIMIT_EXCEEDED.to_string(),
        BatchWriteItemError::ItemCollectionSizeLimitExceededException(_) => {
            "Item collection size limit exceeded".to_string()
        }
        BatchWriteItemError::InternalServerError(_) => INTERNAL_SERVER_ERROR.to_string(),
        err => DisplayErrorContext(&err).to_string(),
    };
    CoreError::transport("BatchWriteItem", message)
}

/// Map a DescribeTable SDK error to CoreError.
pub fn map_describe_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DescribeTableError, R>,
    table_name: &str,
) -> CoreError {
    let message = match err.into_service_error() {
        DescribeTableError::ResourceNotFoundException(_) => {
            format!("Table '{table_name}' not found")
        }
        DescribeTableError::InternalServerError(_) => INTERNAL_SERVER_ERROR.to_string(),
        err => DisplayErrorContext(&err).to_string(),
    };
    CoreError::transport("DescribeTable", message)
}

/// Map a ListTables SDK error to CoreError.
pub fn map_list_tables_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<ListTablesError, R>,
) -> CoreError {
    let message = match err.into_service_error() {
        ListTablesError::InternalServerError(_) => INTERNAL_SERVER_ERROR.to_string(),
        err => DisplayErrorContext(&err).to_string(),
    };
    CoreError::transport("ListTables", message)
}
