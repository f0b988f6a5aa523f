use async_trait::async_trait;
use aws_sdk_sqs::Client;
use awsk_core::queue::{ForwardPayload, MessageSink, QueueDescriptor};
use awsk_core::Result;
use tracing::debug;

use super::conversions::to_sdk_attributes;
use super::error::map_sqs_error;
use crate::aws::sdk_config;

/// Sends forwarded messages to one queue.
#[derive(Debug, Clone)]
pub struct SqsProducer {
    client: Client,
    queue_url: String,
    fifo: bool,
}

impl SqsProducer {
    pub fn new(client: Client, queue_url: impl Into<String>, fifo: bool) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            fifo,
        }
    }

    pub async fn connect(descriptor: &QueueDescriptor, endpoint_url: Option<&str>) -> Self {
        let config = sdk_config(descriptor.region(), descriptor.credentials(), endpoint_url).await;
        Self::new(
            Client::new(&config),
            descriptor.endpoint(),
            descriptor.is_fifo(),
        )
    }
}

#[async_trait]
impl MessageSink for SqsProducer {
    fn is_fifo(&self) -> bool {
        self.fifo
    }

    async fn send(&self, payload: &ForwardPayload) -> Result<()> {
        let attributes = to_sdk_attributes(&payload.attributes)?;

        let mut request = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(&payload.body);
        if !attributes.is_empty() {
            request = request.set_message_attributes(Some(attributes));
        }
        if let Some(fifo) = &payload.fifo {
            request = request
                .message_group_id(&fifo.group_id)
                .message_deduplication_id(&fifo.deduplication_id);
        }

        let output = request
            .send()
            .await
            .map_err(|e| map_sqs_error("SendMessage", e))?;

        debug!(
            source_id = %payload.id,
            destination_id = output.message_id().unwrap_or_default(),
            "Message sent"
        );
        Ok(())
    }
}
