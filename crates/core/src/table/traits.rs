use async_trait::async_trait;

use super::KeySchema;
use crate::error::Result;

/// Source of a table's key schema.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Gets the primary key layout of the table.
    async fn key_schema(&self) -> Result<KeySchema>;
}
