//! Shared foundation for the tailpin offset tool.
//!
//! This crate provides:
//! - The common error type used across all tailpin crates
//! - Core identifiers (`TopicPartition`, `BrokerEndpoint`)
//! - The length-prefixed frame codec both wire protocols share

pub mod error;
pub mod frame;
pub mod types;

pub use error::{Error, Result};
pub use frame::FrameCodec;
pub use types::{BrokerEndpoint, BrokerId, Offset, TopicPartition};
