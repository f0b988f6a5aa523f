use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::table::Credentials;

/// Identifies a queue endpoint. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDescriptor {
    endpoint: String,
    region: String,
    credentials: Credentials,
}

impl QueueDescriptor {
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, ValidationError> {
        let endpoint = endpoint.into();
        let region = region.into();
        if endpoint.trim().is_empty() {
            return Err(ValidationError::MissingInput("queue endpoint"));
        }
        if region.trim().is_empty() {
            return Err(ValidationError::MissingInput("region"));
        }
        Ok(Self {
            endpoint,
            region,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Queue name, the last path segment of the endpoint.
    pub fn name(&self) -> &str {
        self.endpoint
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.endpoint)
    }

    /// FIFO queues are recognized by their `.fifo` name suffix.
    pub fn is_fifo(&self) -> bool {
        self.name().ends_with(".fifo")
    }
}

/// A typed message attribute as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageAttribute {
    /// `String`, `Number` or `Binary`, optionally with a `.custom` suffix.
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Vec<u8>>,
    pub string_list_values: Vec<String>,
    pub binary_list_values: Vec<Vec<u8>>,
}

impl MessageAttribute {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn number(value: impl Into<String>) -> Self {
        Self {
            data_type: "Number".to_string(),
            string_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        Self {
            data_type: "Binary".to_string(),
            binary_value: Some(value.into()),
            ..Self::default()
        }
    }
}

/// A message received from a source queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub body: String,
    pub attributes: BTreeMap<String, MessageAttribute>,
    /// Handle used to acknowledge (delete) the message once forwarded.
    pub receipt_handle: Option<String>,
}

impl Message {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            attributes: BTreeMap::new(),
            receipt_handle: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: MessageAttribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }
}

/// Value of a sanitized, scalar attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
    /// Carries both `String` and `Number` attributes.
    String(String),
    Binary(Vec<u8>),
}

/// A scalar attribute that passed sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardAttribute {
    pub data_type: String,
    pub value: ScalarValue,
}

/// Ordering and deduplication ids required by FIFO destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoFields {
    pub group_id: String,
    pub deduplication_id: String,
}

/// What gets sent to the destination for one source message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardPayload {
    pub id: String,
    pub body: String,
    pub attributes: BTreeMap<String, ForwardAttribute>,
    pub fifo: Option<FifoFields>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "secret").unwrap()
    }

    #[test]
    fn test_queue_descriptor_fifo_detection() {
        let standard = QueueDescriptor::new(
            "https://sqs.us-east-1.amazonaws.com/123456789012/orders",
            "us-east-1",
            credentials(),
        )
        .unwrap();
        let fifo = QueueDescriptor::new(
            "https://sqs.us-east-1.amazonaws.com/123456789012/orders.fifo",
            "us-east-1",
            credentials(),
        )
        .unwrap();

        assert_eq!(standard.name(), "orders");
        assert!(!standard.is_fifo());
        assert_eq!(fifo.name(), "orders.fifo");
        assert!(fifo.is_fifo());
    }

    #[test]
    fn test_queue_descriptor_fifo_ignores_host() {
        let queue = QueueDescriptor::new(
            "http://queue.fifo.local:4566/000000000000/plain/",
            "us-east-1",
            credentials(),
        )
        .unwrap();

        assert_eq!(queue.name(), "plain");
        assert!(!queue.is_fifo());
    }

    #[test]
    fn test_queue_descriptor_requires_endpoint_and_region() {
        assert_eq!(
            QueueDescriptor::new(" ", "us-east-1", credentials()),
            Err(ValidationError::MissingInput("queue endpoint"))
        );
        assert_eq!(
            QueueDescriptor::new("https://example/q", "", credentials()),
            Err(ValidationError::MissingInput("region"))
        );
    }
}
