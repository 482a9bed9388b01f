//! Minimal ZooKeeper client for tailpin.
//!
//! Implements just enough of the ZooKeeper client protocol to read and
//! overwrite znode data: session handshake, getData, setData and session
//! close, with exponential backoff around session establishment. The wire
//! records live in `codec`, the session state machine in `client`.

pub mod client;
pub mod codec;
pub mod error;
pub mod retry;

pub use client::{ZkClient, ZkConfig, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SESSION_TIMEOUT_MS};
pub use codec::Stat;
pub use error::{Result, ZkError};
pub use retry::{retry_async_with_backoff, ExponentialBackoff, RetryConfig};
