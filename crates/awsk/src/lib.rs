//! AWS side of awsk (Imperative Shell).
//!
//! Adapters that implement the `awsk_core` provider traits on top of the
//! DynamoDB and SQS SDKs, runtime configuration, and the [`toolkit`] that
//! wires descriptors, adapters and core operations together.

pub mod aws;
pub mod config;
pub mod dynamodb;
pub mod sqs;
pub mod toolkit;

pub use config::Config;
pub use toolkit::Toolkit;
