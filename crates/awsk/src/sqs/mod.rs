//! SQS adapter.
//!
//! [`SqsConsumer`] is the drain source, [`SqsProducer`] the destination.

pub mod conversions;
mod consumer;
pub mod error;
mod producer;

pub use consumer::{ReceiveSettings, SqsConsumer};
pub use producer::SqsProducer;
