//! DynamoDB adapter.
//!
//! - `conversions` - SDK types to and from `awsk_core` types
//! - `error` - SDK error mapping
//! - `table` - provider trait implementations and table listing

pub mod conversions;
pub mod error;
mod table;

pub use table::{list_tables, DynamoDbTable};
