use async_trait::async_trait;

use crate::error::Result;
use crate::table::{Key, Record};

/// Largest number of requests a single bulk call may carry.
pub const MAX_BATCH_SIZE: usize = 25;

/// One operation inside a bulk call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    Put(Record),
    Delete(Key),
}

/// Provider acknowledgement of one bulk call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Requests the provider accepted the call for but did not apply.
    pub unprocessed: Vec<WriteRequest>,
}

impl BatchOutcome {
    pub fn complete() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

/// Issues bulk write/delete calls against one table.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Sends one bulk call with at most [`MAX_BATCH_SIZE`] requests.
    async fn write_batch(&self, batch: Vec<WriteRequest>) -> Result<BatchOutcome>;
}
