//! SQS message conversion functions.

use std::collections::HashMap;

use aws_sdk_sqs::primitives::Blob;
use aws_sdk_sqs::types::{Message as SdkMessage, MessageAttributeValue};
use awsk_core::queue::{ForwardAttribute, Message, MessageAttribute, ScalarValue};
use awsk_core::CoreError;

/// Convert a received SDK message to core form.
pub fn from_sdk_message(message: &SdkMessage) -> Result<Message, CoreError> {
    let id = message
        .message_id()
        .ok_or_else(|| CoreError::Conversion("Received message has no id".to_string()))?;

    let attributes = message
        .message_attributes()
        .map(|attributes| {
            attributes
                .iter()
                .map(|(name, value)| (name.clone(), from_sdk_attribute(value)))
                .collect()
        })
        .unwrap_or_default();

    Ok(Message {
        id: id.to_string(),
        body: message.body().unwrap_or_default().to_string(),
        attributes,
        receipt_handle: message.receipt_handle().map(str::to_string),
    })
}

pub fn from_sdk_attribute(value: &MessageAttributeValue) -> MessageAttribute {
    MessageAttribute {
        data_type: value.data_type().to_string(),
        string_value: value.string_value().map(str::to_string),
        binary_value: value.binary_value().map(|b| b.as_ref().to_vec()),
        string_list_values: value.string_list_values().to_vec(),
        binary_list_values: value
            .binary_list_values()
            .iter()
            .map(|b| b.as_ref().to_vec())
            .collect(),
    }
}

/// Convert a sanitized attribute to the SDK form used by SendMessage.
pub fn to_sdk_attribute(attribute: &ForwardAttribute) -> Result<MessageAttributeValue, CoreError> {
    let builder = MessageAttributeValue::builder().data_type(&attribute.data_type);
    let builder = match &attribute.value {
        ScalarValue::String(value) => builder.string_value(value),
        ScalarValue::Binary(value) => builder.binary_value(Blob::new(value.clone())),
    };
    builder
        .build()
        .map_err(|e| CoreError::Conversion(format!("Failed to build attribute: {e}")))
}

pub fn to_sdk_attributes(
    attributes: &std::collections::BTreeMap<String, ForwardAttribute>,
) -> Result<HashMap<String, MessageAttributeValue>, CoreError> {
    attributes
        .iter()
        .map(|(name, attribute)| Ok((name.clone(), to_sdk_attribute(attribute)?)))
        .collect()
}
