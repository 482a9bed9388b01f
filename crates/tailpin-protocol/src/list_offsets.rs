//! ListOffsets API types (API key 2, versions 0-1)
//!
//! A consumer-side query: for each partition, the broker answers with the
//! offsets closest to a target timestamp. With `LATEST_TIMESTAMP` the first
//! offset returned is the log-end offset of the partition. v0 responses
//! carry an array of offsets (newest first); v1 collapsed that to a single
//! timestamp/offset pair.

use serde::{Deserialize, Serialize};

use crate::wire::{Decoder, Encoder, KafkaDecodable, KafkaEncodable};
use tailpin_common::{Error, Result};

/// Highest ListOffsets API version these codecs understand.
pub const MAX_SUPPORTED_VERSION: i16 = 1;

/// Timestamp value asking for the log-end offset
pub const LATEST_TIMESTAMP: i64 = -1;
/// Timestamp value asking for the log-start offset
pub const EARLIEST_TIMESTAMP: i64 = -2;
/// Replica id consumers send (only brokers use real ids here)
pub const CONSUMER_REPLICA_ID: i32 = -1;

fn check_version(version: i16) -> Result<()> {
    if (0..=MAX_SUPPORTED_VERSION).contains(&version) {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "Unsupported ListOffsets API version: {}",
            version
        )))
    }
}

/// ListOffsets request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOffsetsRequest {
    /// Replica ID of the requester (-1 for consumers)
    pub replica_id: i32,
    /// Topics to list offsets for
    pub topics: Vec<ListOffsetsRequestTopic>,
}

impl ListOffsetsRequest {
    /// Request the latest offset of a single partition, the query shape
    /// this tool sends to each partition leader.
    pub fn latest_for(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            replica_id: CONSUMER_REPLICA_ID,
            topics: vec![ListOffsetsRequestTopic {
                name: topic.into(),
                partitions: vec![ListOffsetsRequestPartition {
                    partition_index: partition,
                    timestamp: LATEST_TIMESTAMP,
                    max_num_offsets: 1,
                }],
            }],
        }
    }
}

/// Topic in ListOffsets request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOffsetsRequestTopic {
    /// Topic name
    pub name: String,
    /// Partitions to list offsets for
    pub partitions: Vec<ListOffsetsRequestPartition>,
}

/// Partition in ListOffsets request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOffsetsRequestPartition {
    /// Partition index
    pub partition_index: i32,
    /// Timestamp to search for (-1 = latest, -2 = earliest)
    pub timestamp: i64,
    /// Maximum number of offsets to return (v0 only; dropped in v1)
    pub max_num_offsets: i32,
}

impl KafkaEncodable for ListOffsetsRequest {
    fn encode(&self, encoder: &mut Encoder<'_>, version: i16) -> Result<()> {
        check_version(version)?;
        encoder.write_i32(self.replica_id);
        encoder.write_i32(self.topics.len() as i32);
        for topic in &self.topics {
            encoder.write_string(Some(&topic.name));
            encoder.write_i32(topic.partitions.len() as i32);
            for partition in &topic.partitions {
                encoder.write_i32(partition.partition_index);
                encoder.write_i64(partition.timestamp);
                if version == 0 {
                    encoder.write_i32(partition.max_num_offsets);
                }
            }
        }
        Ok(())
    }
}

impl KafkaDecodable for ListOffsetsRequest {
    fn decode(decoder: &mut Decoder<'_>, version: i16) -> Result<Self> {
        check_version(version)?;
        let replica_id = decoder.read_i32()?;
        let topic_count = decoder.read_i32()?;
        if topic_count < 0 {
            return Err(Error::Protocol(format!(
                "Negative topic count: {}",
                topic_count
            )));
        }
        let mut topics = Vec::with_capacity(topic_count as usize);
        for _ in 0..topic_count {
            let name = decoder
                .read_string()?
                .ok_or_else(|| Error::Protocol("Topic name cannot be null".into()))?;
            let partition_count = decoder.read_i32()?;
            if partition_count < 0 {
                return Err(Error::Protocol(format!(
                    "Negative partition count: {}",
                    partition_count
                )));
            }
            let mut partitions = Vec::with_capacity(partition_count as usize);
            for _ in 0..partition_count {
                let partition_index = decoder.read_i32()?;
                let timestamp = decoder.read_i64()?;
                let max_num_offsets = if version == 0 { decoder.read_i32()? } else { 1 };
                partitions.push(ListOffsetsRequestPartition {
                    partition_index,
                    timestamp,
                    max_num_offsets,
                });
            }
            topics.push(ListOffsetsRequestTopic { name, partitions });
        }
        Ok(ListOffsetsRequest { replica_id, topics })
    }
}

/// ListOffsets response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOffsetsResponse {
    /// Topics with offset info
    pub topics: Vec<ListOffsetsResponseTopic>,
}

impl ListOffsetsResponse {
    /// Find the entry for a given topic and partition.
    pub fn partition(&self, topic: &str, partition: i32) -> Option<&ListOffsetsResponsePartition> {
        self.topics
            .iter()
            .find(|t| t.name == topic)?
            .partitions
            .iter()
            .find(|p| p.partition_index == partition)
    }
}

/// Topic in ListOffsets response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOffsetsResponseTopic {
    /// Topic name
    pub name: String,
    /// Partitions with offset info
    pub partitions: Vec<ListOffsetsResponsePartition>,
}

/// Partition in ListOffsets response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOffsetsResponsePartition {
    /// Partition index
    pub partition_index: i32,
    /// Error code
    pub error_code: i16,
    /// Timestamp of the found offset (v1+; -1 on v0)
    pub timestamp: i64,
    /// Offsets found, newest first (v0 returns an array, v1 a single value)
    pub offsets: Vec<i64>,
}

impl ListOffsetsResponsePartition {
    /// First offset in the reply, the log-end offset for a latest-timestamp
    /// query. None when the broker answered with an empty offset list.
    pub fn latest(&self) -> Option<i64> {
        self.offsets.first().copied()
    }
}

impl KafkaEncodable for ListOffsetsResponse {
    fn encode(&self, encoder: &mut Encoder<'_>, version: i16) -> Result<()> {
        check_version(version)?;
        encoder.write_i32(self.topics.len() as i32);
        for topic in &self.topics {
            encoder.write_string(Some(&topic.name));
            encoder.write_i32(topic.partitions.len() as i32);
            for partition in &topic.partitions {
                encoder.write_i32(partition.partition_index);
                encoder.write_i16(partition.error_code);
                if version == 0 {
                    encoder.write_i64_array(&partition.offsets);
                } else {
                    encoder.write_i64(partition.timestamp);
                    encoder.write_i64(partition.latest().unwrap_or(-1));
                }
            }
        }
        Ok(())
    }
}

impl KafkaDecodable for ListOffsetsResponse {
    fn decode(decoder: &mut Decoder<'_>, version: i16) -> Result<Self> {
        check_version(version)?;
        let topic_count = decoder.read_i32()?;
        if topic_count < 0 {
            return Err(Error::Protocol(format!(
                "Negative topic count: {}",
                topic_count
            )));
        }
        let mut topics = Vec::with_capacity(topic_count as usize);
        for _ in 0..topic_count {
            let name = decoder
                .read_string()?
                .ok_or_else(|| Error::Protocol("Topic name cannot be null".into()))?;
            let partition_count = decoder.read_i32()?;
            if partition_count < 0 {
                return Err(Error::Protocol(format!(
                    "Negative partition count: {}",
                    partition_count
                )));
            }
            let mut partitions = Vec::with_capacity(partition_count as usize);
            for _ in 0..partition_count {
                let partition_index = decoder.read_i32()?;
                let error_code = decoder.read_i16()?;
                let (timestamp, offsets) = if version == 0 {
                    (-1, decoder.read_i64_array()?)
                } else {
                    let timestamp = decoder.read_i64()?;
                    let offset = decoder.read_i64()?;
                    (timestamp, vec![offset])
                };
                partitions.push(ListOffsetsResponsePartition {
                    partition_index,
                    error_code,
                    timestamp,
                    offsets,
                });
            }
            topics.push(ListOffsetsResponseTopic { name, partitions });
        }
        Ok(ListOffsetsResponse { topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encode<T: KafkaEncodable>(value: &T, version: i16) -> bytes::Bytes {
        let mut buf = BytesMut::new();
        let mut encoder = Encoder::new(&mut buf);
        value.encode(&mut encoder, version).unwrap();
        buf.freeze()
    }

    #[test]
    fn latest_query_v0_wire_format() {
        let request = ListOffsetsRequest::latest_for("t1", 0);
        let bytes = encode(&request, 0);
        assert_eq!(
            bytes.as_ref(),
            [
                0xff, 0xff, 0xff, 0xff, // replica_id = -1
                0x00, 0x00, 0x00, 0x01, // topic count = 1
                0x00, 0x02, b't', b'1', // "t1"
                0x00, 0x00, 0x00, 0x01, // partition count = 1
                0x00, 0x00, 0x00, 0x00, // partition_index = 0
                0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // timestamp = -1
                0x00, 0x00, 0x00, 0x01, // max_num_offsets = 1
            ]
        );
    }

    #[test]
    fn request_v1_drops_max_num_offsets() {
        let request = ListOffsetsRequest::latest_for("t1", 0);
        let v0 = encode(&request, 0);
        let v1 = encode(&request, 1);
        assert_eq!(v0.len(), v1.len() + 4);

        let mut bytes = v1;
        let mut decoder = Decoder::new(&mut bytes);
        let decoded = ListOffsetsRequest::decode(&mut decoder, 1).unwrap();
        assert_eq!(decoded.topics[0].partitions[0].timestamp, LATEST_TIMESTAMP);
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn response_roundtrip_v0() {
        let response = ListOffsetsResponse {
            topics: vec![ListOffsetsResponseTopic {
                name: "t1".into(),
                partitions: vec![
                    ListOffsetsResponsePartition {
                        partition_index: 0,
                        error_code: 0,
                        timestamp: -1,
                        offsets: vec![42, 17, 0],
                    },
                    ListOffsetsResponsePartition {
                        partition_index: 1,
                        error_code: 6,
                        timestamp: -1,
                        offsets: vec![],
                    },
                ],
            }],
        };

        let mut bytes = encode(&response, 0);
        let mut decoder = Decoder::new(&mut bytes);
        let decoded = ListOffsetsResponse::decode(&mut decoder, 0).unwrap();

        let p0 = decoded.partition("t1", 0).unwrap();
        assert_eq!(p0.latest(), Some(42));
        assert_eq!(p0.offsets, vec![42, 17, 0]);

        let p1 = decoded.partition("t1", 1).unwrap();
        assert_eq!(p1.error_code, 6);
        assert_eq!(p1.latest(), None);

        assert!(decoded.partition("t1", 9).is_none());
        assert!(decoded.partition("other", 0).is_none());
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn response_roundtrip_v1() {
        let response = ListOffsetsResponse {
            topics: vec![ListOffsetsResponseTopic {
                name: "t1".into(),
                partitions: vec![ListOffsetsResponsePartition {
                    partition_index: 3,
                    error_code: 0,
                    timestamp: 1_500_000_000_000,
                    offsets: vec![99],
                }],
            }],
        };

        let mut bytes = encode(&response, 1);
        let mut decoder = Decoder::new(&mut bytes);
        let decoded = ListOffsetsResponse::decode(&mut decoder, 1).unwrap();

        let p = decoded.partition("t1", 3).unwrap();
        assert_eq!(p.timestamp, 1_500_000_000_000);
        assert_eq!(p.latest(), Some(99));
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let request = ListOffsetsRequest::latest_for("t", 0);
        let mut buf = BytesMut::new();
        let mut encoder = Encoder::new(&mut buf);
        assert!(request.encode(&mut encoder, 2).is_err());
    }
}
