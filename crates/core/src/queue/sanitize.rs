//! Message attribute sanitization.
//!
//! Only scalar attributes can be forwarded. List types are rejected, which
//! fails the whole drain.

use std::collections::BTreeMap;

use super::types::{ForwardAttribute, MessageAttribute, ScalarValue};
use crate::error::ValidationError;

/// Validates every attribute of a message and converts it to its scalar form.
pub fn sanitize_attributes(
    attributes: &BTreeMap<String, MessageAttribute>,
) -> Result<BTreeMap<String, ForwardAttribute>, ValidationError> {
    attributes
        .iter()
        .map(|(name, attribute)| Ok((name.clone(), sanitize_attribute(name, attribute)?)))
        .collect()
}

/// Validates one attribute against its declared data type.
pub fn sanitize_attribute(
    name: &str,
    attribute: &MessageAttribute,
) -> Result<ForwardAttribute, ValidationError> {
    let unsupported = || ValidationError::UnsupportedAttributeType {
        name: name.to_string(),
        data_type: attribute.data_type.clone(),
    };
    let invalid = |reason: &str| ValidationError::InvalidAttributeValue {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if attribute.data_type.contains("List")
        || !attribute.string_list_values.is_empty()
        || !attribute.binary_list_values.is_empty()
    {
        return Err(unsupported());
    }

    let base_type = attribute
        .data_type
        .split('.')
        .next()
        .unwrap_or(&attribute.data_type);

    let value = match base_type {
        "String" => {
            let value = attribute
                .string_value
                .as_ref()
                .ok_or_else(|| invalid("missing string value"))?;
            ScalarValue::String(value.clone())
        }
        "Number" => {
            let value = attribute
                .string_value
                .as_ref()
                .ok_or_else(|| invalid("missing number value"))?;
            let number = value
                .trim()
                .parse::<f64>()
                .map_err(|_| invalid("not a number"))?;
            if !number.is_finite() {
                return Err(invalid("not a finite number"));
            }
            ScalarValue::String(value.clone())
        }
        "Binary" => {
            let value = attribute
                .binary_value
                .as_ref()
                .ok_or_else(|| invalid("missing binary value"))?;
            ScalarValue::Binary(value.clone())
        }
        _ => return Err(unsupported()),
    };

    Ok(ForwardAttribute {
        data_type: attribute.data_type.clone(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_attributes_pass_through() {
        let attributes = BTreeMap::from([
            ("trace".to_string(), MessageAttribute::string("abc")),
            ("retries".to_string(), MessageAttribute::number("3")),
            ("blob".to_string(), MessageAttribute::binary(b"\x00\x01".to_vec())),
        ]);

        let sanitized = sanitize_attributes(&attributes).unwrap();

        assert_eq!(sanitized.len(), 3);
        assert_eq!(
            sanitized["retries"],
            ForwardAttribute {
                data_type: "Number".to_string(),
                value: ScalarValue::String("3".to_string()),
            }
        );
        assert_eq!(
            sanitized["blob"].value,
            ScalarValue::Binary(vec![0x00, 0x01])
        );
    }

    #[test]
    fn test_custom_type_suffix_is_kept() {
        let attribute = MessageAttribute {
            data_type: "Number.float".to_string(),
            string_value: Some("1.5".to_string()),
            ..MessageAttribute::default()
        };

        let sanitized = sanitize_attribute("ratio", &attribute).unwrap();

        assert_eq!(sanitized.data_type, "Number.float");
    }

    #[test]
    fn test_list_attribute_is_rejected() {
        let attribute = MessageAttribute {
            data_type: "StringList".to_string(),
            string_list_values: vec!["a".to_string(), "b".to_string()],
            ..MessageAttribute::default()
        };

        assert_eq!(
            sanitize_attribute("tags", &attribute),
            Err(ValidationError::UnsupportedAttributeType {
                name: "tags".to_string(),
                data_type: "StringList".to_string(),
            })
        );
    }

    #[test]
    fn test_list_values_under_scalar_type_are_rejected() {
        let attribute = MessageAttribute {
            binary_list_values: vec![vec![1]],
            ..MessageAttribute::binary(vec![1])
        };

        assert!(matches!(
            sanitize_attribute("blobs", &attribute),
            Err(ValidationError::UnsupportedAttributeType { .. })
        ));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        assert!(matches!(
            sanitize_attribute("count", &MessageAttribute::number("many")),
            Err(ValidationError::InvalidAttributeValue { .. })
        ));
    }

    #[test]
    fn test_non_finite_number_is_rejected() {
        for raw in ["NaN", "inf", "-infinity"] {
            assert!(
                matches!(
                    sanitize_attribute("count", &MessageAttribute::number(raw)),
                    Err(ValidationError::InvalidAttributeValue { .. })
                ),
                "{raw} was accepted"
            );
        }
    }

    #[test]
    fn test_missing_value_is_rejected() {
        let attribute = MessageAttribute {
            data_type: "String".to_string(),
            ..MessageAttribute::default()
        };

        assert!(matches!(
            sanitize_attribute("name", &attribute),
            Err(ValidationError::InvalidAttributeValue { .. })
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let attribute = MessageAttribute {
            data_type: "Map".to_string(),
            string_value: Some("{}".to_string()),
            ..MessageAttribute::default()
        };

        assert!(matches!(
            sanitize_attribute("nested", &attribute),
            Err(ValidationError::UnsupportedAttributeType { .. })
        ));
    }
}
