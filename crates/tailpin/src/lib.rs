//! Offset capture pipeline: resolve partition leaders, read each
//! partition's latest offset and record the values under the consumer
//! group's ZooKeeper paths.

pub mod broker;
pub mod config;
pub mod fetcher;
pub mod publisher;
pub mod report;
pub mod resolver;

pub use broker::BrokerExchange;
pub use config::{parse_broker_list, RunConfig};
pub use fetcher::{fetch_latest_offsets, FetchError, OffsetMap};
pub use publisher::{offset_path, publish_offsets, PublishSummary};
pub use report::RunReport;
pub use resolver::{resolve_leaders, LeaderMap};
