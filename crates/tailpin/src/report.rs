//! Run output in plain or JSON form.

use serde::Serialize;

use crate::fetcher::OffsetMap;
use crate::resolver::LeaderMap;

/// One partition's outcome.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionReport {
    pub topic: String,
    pub partition: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a run found, in partition order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub group: String,
    pub partitions: Vec<PartitionReport>,
}

impl RunReport {
    pub fn assemble(group: &str, leaders: &LeaderMap, offsets: &OffsetMap) -> Self {
        let partitions = offsets
            .iter()
            .map(|(tp, outcome)| PartitionReport {
                topic: tp.topic.clone(),
                partition: tp.partition,
                leader: leaders.get(tp).map(|endpoint| endpoint.to_string()),
                offset: outcome.as_ref().ok().copied(),
                error: outcome.as_ref().err().map(|e| e.to_string()),
            })
            .collect();
        Self {
            group: group.to_string(),
            partitions,
        }
    }

    /// One `<topic>-<partition>: <offset>` line per fetched offset.
    /// Failed partitions are already on the log, so plain output only
    /// carries the values.
    pub fn print_plain(&self) {
        for partition in &self.partitions {
            if let Some(offset) = partition.offset {
                println!("{}-{}: {}", partition.topic, partition.partition, offset);
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
