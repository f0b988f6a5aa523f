//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between SDK types and `awsk_core` types.
//! These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue as SdkValue, DeleteRequest, KeySchemaElement, KeyType,
    PutRequest, WriteRequest as SdkWriteRequest,
};
use awsk_core::batch::WriteRequest;
use awsk_core::scan::ScanCursor;
use awsk_core::table::{
    AttributeValue, Key, KeyAttribute, KeyAttributeType, KeySchema, Record,
};
use awsk_core::{CoreError, ValidationError};

/// An item as the SDK represents it.
pub type Item = HashMap<String, SdkValue>;

// ============================================================================
// Attribute values
// ============================================================================

/// Convert a core attribute value to its SDK form.
pub fn to_sdk_value(value: &AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S(s) => SdkValue::S(s.clone()),
        AttributeValue::N(n) => SdkValue::N(n.clone()),
        AttributeValue::B(b) => SdkValue::B(Blob::new(b.clone())),
        AttributeValue::Bool(b) => SdkValue::Bool(*b),
        AttributeValue::Null => SdkValue::Null(true),
        AttributeValue::Ss(values) => SdkValue::Ss(values.clone()),
        AttributeValue::Ns(values) => SdkValue::Ns(values.clone()),
        AttributeValue::Bs(values) => {
            SdkValue::Bs(values.iter().map(|b| Blob::new(b.clone())).collect())
        }
        AttributeValue::L(values) => SdkValue::L(values.iter().map(to_sdk_value).collect()),
        AttributeValue::M(map) => SdkValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_sdk_value(v)))
                .collect(),
        ),
    }
}

/// Convert an SDK attribute value to its core form.
pub fn from_sdk_value(value: &SdkValue) -> Result<AttributeValue, CoreError> {
    Ok(match value {
        SdkValue::S(s) => AttributeValue::S(s.clone()),
        SdkValue::N(n) => AttributeValue::N(n.clone()),
        SdkValue::B(b) => AttributeValue::B(b.as_ref().to_vec()),
        SdkValue::Bool(b) => AttributeValue::Bool(*b),
        SdkValue::Null(_) => AttributeValue::Null,
        SdkValue::Ss(values) => AttributeValue::Ss(values.clone()),
        SdkValue::Ns(values) => AttributeValue::Ns(values.clone()),
        SdkValue::Bs(values) => {
            AttributeValue::Bs(values.iter().map(|b| b.as_ref().to_vec()).collect())
        }
        SdkValue::L(values) => AttributeValue::L(
            values
                .iter()
                .map(from_sdk_value)
                .collect::<Result<_, _>>()?,
        ),
        SdkValue::M(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), from_sdk_value(v)?)))
                .collect::<Result<_, CoreError>>()?,
        ),
        other => {
            return Err(CoreError::Conversion(format!(
                "Unsupported attribute value: {other:?}"
            )))
        }
    })
}

// ============================================================================
// Items, keys and cursors
// ============================================================================

pub fn record_to_item(record: &Record) -> Item {
    record
        .iter()
        .map(|(k, v)| (k.clone(), to_sdk_value(v)))
        .collect()
}

pub fn item_to_record(item: &Item) -> Result<Record, CoreError> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), from_sdk_value(v)?)))
        .collect()
}

pub fn key_to_item(key: &Key) -> Item {
    key.attributes()
        .iter()
        .map(|(k, v)| (k.clone(), to_sdk_value(v)))
        .collect()
}

pub fn cursor_to_item(cursor: &ScanCursor) -> Item {
    cursor
        .position()
        .iter()
        .map(|(k, v)| (k.clone(), to_sdk_value(v)))
        .collect()
}

/// `LastEvaluatedKey` to cursor. An empty key means the scan is done.
pub fn item_to_cursor(item: Option<&Item>) -> Result<Option<ScanCursor>, CoreError> {
    match item {
        Some(item) if !item.is_empty() => Ok(Some(ScanCursor::new(item_to_record(item)?))),
        _ => Ok(None),
    }
}

// ============================================================================
// Write requests
// ============================================================================

pub fn to_sdk_write_request(request: &WriteRequest) -> Result<SdkWriteRequest, CoreError> {
    let built = match request {
        WriteRequest::Put(record) => SdkWriteRequest::builder().put_request(
            PutRequest::builder()
                .set_item(Some(record_to_item(record)))
                .build()
                .map_err(|e| CoreError::Conversion(e.to_string()))?,
        ),
        WriteRequest::Delete(key) => SdkWriteRequest::builder().delete_request(
            DeleteRequest::builder()
                .set_key(Some(key_to_item(key)))
                .build()
                .map_err(|e| CoreError::Conversion(e.to_string()))?,
        ),
    };
    Ok(built.build())
}

/// Convert an unprocessed request reported by the service back to core form.
pub fn from_sdk_write_request(request: &SdkWriteRequest) -> Result<WriteRequest, CoreError> {
    if let Some(put) = request.put_request() {
        return Ok(WriteRequest::Put(item_to_record(put.item())?));
    }
    if let Some(delete) = request.delete_request() {
        return Ok(WriteRequest::Delete(Key::from_attributes(item_to_record(
            delete.key(),
        )?)));
    }
    Err(CoreError::Conversion(
        "Write request has neither a put nor a delete".to_string(),
    ))
}

// ============================================================================
// Key schema
// ============================================================================

/// Build a key schema from a table description: HASH first, then RANGE,
/// types taken from the attribute definitions.
pub fn key_schema_from_description(
    elements: &[KeySchemaElement],
    definitions: &[AttributeDefinition],
) -> Result<KeySchema, ValidationError> {
    let attribute = |element: &KeySchemaElement| -> Result<KeyAttribute, ValidationError> {
        let name = element.attribute_name();
        let definition = definitions
            .iter()
            .find(|d| d.attribute_name() == name)
            .ok_or_else(|| {
                ValidationError::InvalidKeySchema(format!(
                    "no attribute definition for key attribute '{name}'"
                ))
            })?;
        let attribute_type =
            KeyAttributeType::from_code(name, definition.attribute_type().as_str())?;
        Ok(KeyAttribute::new(name, attribute_type))
    };

    let hash = elements
        .iter()
        .find(|e| *e.key_type() == KeyType::Hash)
        .ok_or_else(|| ValidationError::InvalidKeySchema("table has no HASH key".to_string()))?;
    let range = elements.iter().find(|e| *e.key_type() == KeyType::Range);

    KeySchema::new(attribute(hash)?, range.map(attribute).transpose()?)
}
