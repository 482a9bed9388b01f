//! Partition leader resolution from cluster metadata.
//!
//! Every seed broker is asked for metadata on the requested topics. Each
//! answer becomes a partial leader map; the partials are merged in seed
//! order so that for any partition reported by several brokers, the answer
//! of the broker listed last wins. Unreachable seeds only shrink the
//! result, they never fail the run.

use std::collections::BTreeMap;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use tailpin_common::{BrokerEndpoint, Result, TopicPartition};
use tailpin_protocol::metadata::{MetadataRequest, MetadataResponse};
use tailpin_protocol::{error_codes, ApiKey};

use crate::broker::BrokerExchange;
use crate::config::RunConfig;

/// Pinned to the oldest version every broker generation understands.
const METADATA_VERSION: i16 = 0;

/// Which broker leads each topic partition. Ordered so reports and
/// publication walk partitions in a stable order.
pub type LeaderMap = BTreeMap<TopicPartition, BrokerEndpoint>;

/// Client id advertised on metadata connections, unique per run.
fn lookup_client_id() -> String {
    format!("leader-lookup-{}", Utc::now().timestamp_millis())
}

/// Queries every seed broker for metadata and merges the answers.
pub async fn resolve_leaders(
    config: &RunConfig,
    brokers: &[BrokerEndpoint],
    topics: &[String],
) -> LeaderMap {
    let client_id = lookup_client_id();
    let concurrency = config.broker_concurrency.max(1);

    let mut partials: Vec<(usize, LeaderMap)> =
        stream::iter(brokers.iter().cloned().enumerate())
            .map(|(position, broker)| {
                let client_id = client_id.clone();
                async move {
                    let partial = match query_broker(config, &broker, &client_id, topics).await {
                        Ok(partial) => partial,
                        Err(e) => {
                            warn!(broker = %broker, "Metadata query failed: {e}");
                            LeaderMap::new()
                        }
                    };
                    (position, partial)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

    // Completion order is nondeterministic; merge in seed order so the
    // last listed broker wins each contested partition.
    partials.sort_by_key(|(position, _)| *position);

    let mut leaders = LeaderMap::new();
    for (_, partial) in partials {
        for (tp, endpoint) in partial {
            leaders.insert(tp, endpoint);
        }
    }

    info!(
        partitions = leaders.len(),
        brokers = brokers.len(),
        "Leader resolution finished"
    );
    leaders
}

async fn query_broker(
    config: &RunConfig,
    broker: &BrokerEndpoint,
    client_id: &str,
    topics: &[String],
) -> Result<LeaderMap> {
    let mut exchange = BrokerExchange::connect(broker, client_id, config).await?;
    let request = MetadataRequest::for_topics(topics.iter().cloned());
    let response: MetadataResponse = exchange
        .request(ApiKey::Metadata, METADATA_VERSION, &request)
        .await?;

    let mut partial = LeaderMap::new();
    for topic in &response.topics {
        if topic.error_code != error_codes::NONE {
            warn!(
                broker = %broker,
                topic = %topic.name,
                "Skipping topic with error {} ({})",
                topic.error_code,
                error_codes::describe(topic.error_code)
            );
            continue;
        }
        for partition in &topic.partitions {
            if partition.error_code != error_codes::NONE {
                // Often a transient replication state; the leader id can
                // still be usable, so only the unresolvable case skips.
                debug!(
                    broker = %broker,
                    topic = %topic.name,
                    partition = partition.partition_index,
                    "Partition reported error {} ({})",
                    partition.error_code,
                    error_codes::describe(partition.error_code)
                );
            }
            let Some(leader) = response.broker(partition.leader_id) else {
                warn!(
                    broker = %broker,
                    "No resolvable leader for {}-{}",
                    topic.name,
                    partition.partition_index
                );
                continue;
            };
            let Ok(port) = u16::try_from(leader.port) else {
                warn!(
                    broker = %broker,
                    "Leader {} reports invalid port {}",
                    leader.node_id,
                    leader.port
                );
                continue;
            };
            partial.insert(
                TopicPartition::new(topic.name.clone(), partition.partition_index),
                BrokerEndpoint::new(leader.host.clone(), port),
            );
        }
    }
    debug!(broker = %broker, partitions = partial.len(), "Collected partition leaders");
    Ok(partial)
}
