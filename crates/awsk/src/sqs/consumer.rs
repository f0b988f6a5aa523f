use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use awsk_core::queue::{Message, MessageSource, QueueDescriptor};
use awsk_core::{CoreError, Result};
use tracing::{debug, info};

use super::conversions::from_sdk_message;
use super::error::map_sqs_error;
use crate::aws::sdk_config;

/// Receive settings of a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveSettings {
    pub wait_time_seconds: u32,
    pub visibility_timeout_seconds: u32,
}

impl Default for ReceiveSettings {
    fn default() -> Self {
        Self {
            wait_time_seconds: 2,
            visibility_timeout_seconds: 30,
        }
    }
}

/// Long-polling consumer of one queue.
///
/// Received messages stay invisible to other consumers for the visibility
/// timeout and are deleted once acknowledged.
#[derive(Debug)]
pub struct SqsConsumer {
    client: Client,
    queue_url: String,
    settings: ReceiveSettings,
    stopped: AtomicBool,
}

impl SqsConsumer {
    pub fn new(client: Client, queue_url: impl Into<String>, settings: ReceiveSettings) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            settings,
            stopped: AtomicBool::new(false),
        }
    }

    pub async fn connect(
        descriptor: &QueueDescriptor,
        endpoint_url: Option<&str>,
        settings: ReceiveSettings,
    ) -> Self {
        let config = sdk_config(descriptor.region(), descriptor.credentials(), endpoint_url).await;
        Self::new(Client::new(&config), descriptor.endpoint(), settings)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for SqsConsumer {
    async fn receive(&self, max: usize) -> Result<Vec<Message>> {
        if self.is_stopped() {
            return Ok(Vec::new());
        }

        let max = i32::try_from(max.clamp(1, 10)).unwrap_or(10);
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max)
            .wait_time_seconds(i32::try_from(self.settings.wait_time_seconds).unwrap_or(20))
            .visibility_timeout(
                i32::try_from(self.settings.visibility_timeout_seconds).unwrap_or(i32::MAX),
            )
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| map_sqs_error("ReceiveMessage", e))?;

        let messages = output
            .messages()
            .iter()
            .map(from_sdk_message)
            .collect::<Result<Vec<_>>>()?;
        debug!(queue_url = %self.queue_url, messages = messages.len(), "Received messages");
        Ok(messages)
    }

    async fn acknowledge(&self, message: &Message) -> Result<()> {
        let receipt = message.receipt_handle.as_deref().ok_or_else(|| {
            CoreError::transport(
                "DeleteMessage",
                format!("message {} has no receipt handle", message.id),
            )
        })?;

        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| map_sqs_error("DeleteMessage", e))?;
        Ok(())
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!(queue_url = %self.queue_url, "Consumer stopped");
        }
    }
}
