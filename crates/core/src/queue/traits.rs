use async_trait::async_trait;

use super::types::{ForwardPayload, Message};
use crate::error::Result;

/// A queue the drain consumes from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Receives up to `max` messages. An empty vector means the queue is
    /// currently empty.
    async fn receive(&self, max: usize) -> Result<Vec<Message>>;

    /// Removes a forwarded message from the queue.
    async fn acknowledge(&self, message: &Message) -> Result<()>;

    /// Stops consuming. Called exactly once per drain.
    fn stop(&self);
}

/// A queue the drain forwards to.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Whether payloads need FIFO group and deduplication ids.
    fn is_fifo(&self) -> bool;

    async fn send(&self, payload: &ForwardPayload) -> Result<()>;
}
