//! Latest-offset queries against partition leaders.
//!
//! Each partition is asked on its own connection to the leader that the
//! resolver found for it. Failures stay per partition: a broker that
//! answers with an error code or cannot be reached marks only its own
//! partitions as failed.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, warn};

use tailpin_common::{BrokerEndpoint, Offset, TopicPartition};
use tailpin_protocol::list_offsets::{ListOffsetsRequest, ListOffsetsResponse};
use tailpin_protocol::{error_codes, ApiKey};

use crate::broker::BrokerExchange;
use crate::config::RunConfig;
use crate::resolver::LeaderMap;

/// Pinned to the oldest version every broker generation understands.
const LIST_OFFSETS_VERSION: i16 = 0;

/// Why no offset could be fetched for a partition.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The leader answered, but with a protocol-level error code.
    #[error("broker error code {code} ({name})")]
    Broker { code: i16, name: &'static str },
    /// The leader could not be reached or the exchange broke down.
    #[error(transparent)]
    Transport(#[from] tailpin_common::Error),
}

impl FetchError {
    fn broker(code: i16) -> Self {
        FetchError::Broker {
            code,
            name: error_codes::describe(code),
        }
    }
}

/// Latest offset per partition, or the reason it could not be read.
pub type OffsetMap = BTreeMap<TopicPartition, Result<Offset, FetchError>>;

/// Fetches the latest offset of every partition in `leaders`.
pub async fn fetch_latest_offsets(
    config: &RunConfig,
    leaders: &LeaderMap,
    client_id: &str,
) -> OffsetMap {
    let concurrency = config.fetch_concurrency.max(1);

    let outcomes: Vec<(TopicPartition, Result<Offset, FetchError>)> = stream::iter(leaders.iter())
        .map(|(tp, leader)| async move {
            let outcome = fetch_one(config, tp, leader, client_id).await;
            if let Err(e) = &outcome {
                warn!(partition = %tp, leader = %leader, "Offset fetch failed: {e}");
            }
            (tp.clone(), outcome)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    outcomes.into_iter().collect()
}

async fn fetch_one(
    config: &RunConfig,
    tp: &TopicPartition,
    leader: &BrokerEndpoint,
    client_id: &str,
) -> Result<Offset, FetchError> {
    let mut exchange = BrokerExchange::connect(leader, client_id, config).await?;
    let request = ListOffsetsRequest::latest_for(tp.topic.clone(), tp.partition);
    let response: ListOffsetsResponse = exchange
        .request(ApiKey::ListOffsets, LIST_OFFSETS_VERSION, &request)
        .await?;

    let partition = response.partition(&tp.topic, tp.partition).ok_or_else(|| {
        tailpin_common::Error::Protocol(format!("Response carries no entry for {tp}"))
    })?;
    if partition.error_code != error_codes::NONE {
        return Err(FetchError::broker(partition.error_code));
    }
    let offset = partition.latest().ok_or_else(|| {
        tailpin_common::Error::Protocol(format!("Response carries no offsets for {tp}"))
    })?;

    debug!(partition = %tp, leader = %leader, offset, "Fetched latest offset");
    Ok(offset)
}
