//! Table resources: descriptors, attribute values, key schemas and keys.

mod keys;
mod schema;
mod traits;
mod types;

pub use keys::{extract_key, PartitionFilter};
pub use schema::{KeyAttribute, KeyAttributeType, KeySchema};
pub use traits::SchemaSource;
pub use types::{AttributeValue, Credentials, Key, Record, TableDescriptor};
