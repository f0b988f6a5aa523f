//! Bulk write/delete: chunking and bounded concurrent dispatch.

mod chunk;
mod dispatch;
mod writer;

pub use chunk::chunk;
pub(crate) use dispatch::dispatch_batch;
pub use dispatch::{apply_batches, delete_all, put_all, BatchOptions, DEFAULT_BATCH_CONCURRENCY};
pub use writer::{BatchOutcome, BatchWriter, WriteRequest, MAX_BATCH_SIZE};
