//! Queue resources and the drain engine.

mod drain;
mod sanitize;
mod traits;
mod types;

pub use drain::{
    redrive, DeduplicationIds, DrainLifecycle, DrainOptions, DrainResult, DrainState,
    ProgressCallback, TerminalCause, DEFAULT_DRAIN_CONCURRENCY, DEFAULT_RECEIVE_BATCH,
    REDRIVE_GROUP_ID,
};
pub use sanitize::{sanitize_attribute, sanitize_attributes};
pub use traits::{MessageSink, MessageSource};
pub use types::{
    FifoFields, ForwardAttribute, ForwardPayload, Message, MessageAttribute, QueueDescriptor,
    ScalarValue,
};
