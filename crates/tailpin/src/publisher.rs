//! Offset publication into the consumer group's ZooKeeper paths.
//!
//! Each offset is written with a read-before and a read-after around it,
//! so the transition is visible in the logs. Writes are unconditional:
//! whatever value sits at the path is overwritten, and when several
//! writers race on the same path the one whose write lands last wins.
//! A path the store does not know yet is left untouched; only groups
//! that have committed offsets before can be repositioned.

use tracing::{info, warn};

use tailpin_common::TopicPartition;
use tailpin_zk::ZkClient;

use crate::fetcher::OffsetMap;

/// Path a group's consumers read their start offset from.
pub fn offset_path(group: &str, tp: &TopicPartition) -> String {
    format!("/consumers/{}/offsets/{}/{}", group, tp.topic, tp.partition)
}

/// What publication did, partition by partition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    /// Offsets written to the store.
    pub written: usize,
    /// Partitions skipped because their fetch already failed.
    pub skipped: usize,
    /// Partitions whose store read or write failed.
    pub failed: usize,
}

/// Writes every successfully fetched offset to the group's paths.
///
/// Store failures are confined to their partition; the walk always
/// continues to the next one.
pub async fn publish_offsets(
    client: &mut ZkClient,
    group: &str,
    offsets: &OffsetMap,
) -> PublishSummary {
    let mut summary = PublishSummary::default();

    for (tp, outcome) in offsets {
        let offset = match outcome {
            Ok(offset) => *offset,
            Err(e) => {
                warn!(partition = %tp, "Not publishing a failed fetch: {e}");
                summary.skipped += 1;
                continue;
            }
        };
        let path = offset_path(group, tp);

        match client.get_data(&path).await {
            Ok((data, _)) => {
                info!(%path, "Offset before update: {}", printable(data.as_deref()));
            }
            Err(e) => {
                warn!(%path, "Could not read current offset, leaving partition untouched: {e}");
                summary.failed += 1;
                continue;
            }
        }

        let value = offset.to_string();
        if let Err(e) = client.set_data(&path, value.as_bytes()).await {
            warn!(%path, "Offset write failed: {e}");
            summary.failed += 1;
            continue;
        }
        summary.written += 1;

        match client.get_data(&path).await {
            Ok((data, _)) => {
                info!(%path, "Offset after update: {}", printable(data.as_deref()));
            }
            Err(e) => warn!(%path, "Could not read back the offset just written: {e}"),
        }
    }

    info!(
        written = summary.written,
        skipped = summary.skipped,
        failed = summary.failed,
        "Offset publication finished"
    );
    summary
}

fn printable(data: Option<&[u8]>) -> String {
    match data {
        Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        None => "<empty>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_path_layout() {
        let tp = TopicPartition::new("events", 3);
        assert_eq!(offset_path("workers", &tp), "/consumers/workers/offsets/events/3");
    }
}
