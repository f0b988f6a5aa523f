//! Key extraction and partition filters.
//!
//! Pure functions, no I/O.

use std::collections::HashMap;

use base64::prelude::*;

use super::schema::{KeyAttributeType, KeySchema};
use super::types::{AttributeValue, Key, Record};
use crate::error::ValidationError;

/// Reduces a record to exactly the attributes of `schema`.
///
/// Fails when an attribute is absent or its value does not have the type the
/// schema declares.
pub fn extract_key(record: &Record, schema: &KeySchema) -> Result<Key, ValidationError> {
    let mut key = HashMap::with_capacity(schema.len());
    for attribute in schema.attributes() {
        let value =
            record
                .get(&attribute.name)
                .ok_or_else(|| ValidationError::MissingKeyAttribute {
                    attribute: attribute.name.clone(),
                })?;
        if !has_type(value, attribute.attribute_type) {
            return Err(ValidationError::KeyTypeMismatch {
                attribute: attribute.name.clone(),
                expected: attribute.attribute_type.code(),
            });
        }
        key.insert(attribute.name.clone(), value.clone());
    }
    Ok(Key::from_attributes(key))
}

fn has_type(value: &AttributeValue, expected: KeyAttributeType) -> bool {
    matches!(
        (value, expected),
        (AttributeValue::S(_), KeyAttributeType::String)
            | (AttributeValue::N(_), KeyAttributeType::Number)
            | (AttributeValue::B(_), KeyAttributeType::Binary)
    )
}

/// Equality condition on the partition key, covering every sort key value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFilter {
    attribute: String,
    value: AttributeValue,
}

impl PartitionFilter {
    /// Builds a filter on the schema's partition key from its textual form.
    ///
    /// Strings are taken as-is, numbers must parse, binary values are base64.
    pub fn parse(schema: &KeySchema, raw: &str) -> Result<Self, ValidationError> {
        let partition = schema.partition_key();
        let invalid = |reason: String| ValidationError::InvalidPartitionValue {
            attribute: partition.name.clone(),
            reason,
        };
        let value = match partition.attribute_type {
            KeyAttributeType::String => {
                if raw.is_empty() {
                    return Err(invalid("value is empty".to_string()));
                }
                AttributeValue::S(raw.to_string())
            }
            KeyAttributeType::Number => {
                let trimmed = raw.trim();
                let number = trimmed
                    .parse::<f64>()
                    .map_err(|e| invalid(format!("not a number ({e})")))?;
                if !number.is_finite() {
                    return Err(invalid("not a finite number".to_string()));
                }
                AttributeValue::N(trimmed.to_string())
            }
            KeyAttributeType::Binary => {
                let bytes = BASE64_STANDARD
                    .decode(raw.trim())
                    .map_err(|e| invalid(format!("not base64 ({e})")))?;
                AttributeValue::B(bytes)
            }
        };
        Ok(Self {
            attribute: partition.name.clone(),
            value,
        })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.attribute) == Some(&self.value)
    }
}
