//! Core for awsk.
//!
//! Pure data types and the bulk operations (scan, batch write/delete, table
//! copy, purge, queue drain). Every operation is generic over the provider
//! traits defined here, so the AWS adapters live in the `awsk` crate and the
//! in-memory fakes in [`memory`] can stand in for them.

pub mod batch;
pub mod error;
pub mod purge;
pub mod queue;
pub mod replicate;
pub mod scan;
pub mod table;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use error::{BulkFailure, CoreError, DrainFailure, Result, ValidationError};
