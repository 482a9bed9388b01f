//! Metadata API types (API key 3, versions 0-1)
//!
//! The request names the topics of interest; the response carries the
//! broker list and, per partition, the node id of the current leader.
//! Joining `partitions[].leader_id` against `brokers[].node_id` yields the
//! endpoint to query for offsets.

use serde::{Deserialize, Serialize};

use crate::wire::{Decoder, Encoder, KafkaDecodable, KafkaEncodable};
use tailpin_common::{BrokerId, Error, Result};

/// Highest Metadata API version these codecs understand.
pub const MAX_SUPPORTED_VERSION: i16 = 1;

fn check_version(version: i16) -> Result<()> {
    if (0..=MAX_SUPPORTED_VERSION).contains(&version) {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "Unsupported Metadata API version: {}",
            version
        )))
    }
}

/// Metadata request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRequest {
    /// Topics to fetch metadata for (None for all topics)
    pub topics: Option<Vec<String>>,
}

impl MetadataRequest {
    pub fn for_topics(topics: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            topics: Some(topics.into_iter().map(Into::into).collect()),
        }
    }
}

impl KafkaEncodable for MetadataRequest {
    fn encode(&self, encoder: &mut Encoder<'_>, version: i16) -> Result<()> {
        check_version(version)?;
        match &self.topics {
            Some(topics) => {
                encoder.write_i32(topics.len() as i32);
                for topic in topics {
                    encoder.write_string(Some(topic));
                }
            }
            // v0 has no null array; an empty array already means "all topics"
            None if version == 0 => encoder.write_i32(0),
            None => encoder.write_i32(-1),
        }
        Ok(())
    }
}

impl KafkaDecodable for MetadataRequest {
    fn decode(decoder: &mut Decoder<'_>, version: i16) -> Result<Self> {
        check_version(version)?;
        let topic_count = decoder.read_i32()?;
        let topics = if topic_count < 0 {
            None
        } else {
            let mut topic_list = Vec::with_capacity(topic_count as usize);
            for _ in 0..topic_count {
                let topic = decoder
                    .read_string()?
                    .ok_or_else(|| Error::Protocol("Topic name cannot be null".into()))?;
                topic_list.push(topic);
            }
            Some(topic_list)
        };
        Ok(MetadataRequest { topics })
    }
}

/// Metadata broker info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataBroker {
    /// Node ID
    pub node_id: BrokerId,
    /// Host name or IP
    pub host: String,
    /// Port number
    pub port: i32,
    /// Rack identifier (v1+)
    pub rack: Option<String>,
}

impl KafkaEncodable for MetadataBroker {
    fn encode(&self, encoder: &mut Encoder<'_>, version: i16) -> Result<()> {
        encoder.write_i32(self.node_id);
        encoder.write_string(Some(&self.host));
        encoder.write_i32(self.port);
        if version >= 1 {
            encoder.write_string(self.rack.as_deref());
        }
        Ok(())
    }
}

impl KafkaDecodable for MetadataBroker {
    fn decode(decoder: &mut Decoder<'_>, version: i16) -> Result<Self> {
        let node_id = decoder.read_i32()?;
        let host = decoder
            .read_string()?
            .ok_or_else(|| Error::Protocol("Broker host cannot be null".into()))?;
        let port = decoder.read_i32()?;
        let rack = if version >= 1 {
            decoder.read_string()?
        } else {
            None
        };
        Ok(MetadataBroker {
            node_id,
            host,
            port,
            rack,
        })
    }
}

/// Metadata partition info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataPartition {
    /// Error code
    pub error_code: i16,
    /// Partition index
    pub partition_index: i32,
    /// Leader node ID (-1 when no leader is available)
    pub leader_id: BrokerId,
    /// Replica nodes
    pub replica_nodes: Vec<i32>,
    /// In-sync replica nodes
    pub isr_nodes: Vec<i32>,
}

impl KafkaEncodable for MetadataPartition {
    fn encode(&self, encoder: &mut Encoder<'_>, _version: i16) -> Result<()> {
        encoder.write_i16(self.error_code);
        encoder.write_i32(self.partition_index);
        encoder.write_i32(self.leader_id);
        encoder.write_i32_array(&self.replica_nodes);
        encoder.write_i32_array(&self.isr_nodes);
        Ok(())
    }
}

impl KafkaDecodable for MetadataPartition {
    fn decode(decoder: &mut Decoder<'_>, _version: i16) -> Result<Self> {
        Ok(MetadataPartition {
            error_code: decoder.read_i16()?,
            partition_index: decoder.read_i32()?,
            leader_id: decoder.read_i32()?,
            replica_nodes: decoder.read_i32_array()?,
            isr_nodes: decoder.read_i32_array()?,
        })
    }
}

/// Metadata topic info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataTopic {
    /// Error code
    pub error_code: i16,
    /// Topic name
    pub name: String,
    /// Whether topic is internal (v1+)
    pub is_internal: bool,
    /// Partition metadata
    pub partitions: Vec<MetadataPartition>,
}

impl KafkaEncodable for MetadataTopic {
    fn encode(&self, encoder: &mut Encoder<'_>, version: i16) -> Result<()> {
        encoder.write_i16(self.error_code);
        encoder.write_string(Some(&self.name));
        if version >= 1 {
            encoder.write_bool(self.is_internal);
        }
        encoder.write_i32(self.partitions.len() as i32);
        for partition in &self.partitions {
            partition.encode(encoder, version)?;
        }
        Ok(())
    }
}

impl KafkaDecodable for MetadataTopic {
    fn decode(decoder: &mut Decoder<'_>, version: i16) -> Result<Self> {
        let error_code = decoder.read_i16()?;
        let name = decoder
            .read_string()?
            .ok_or_else(|| Error::Protocol("Topic name cannot be null".into()))?;
        let is_internal = if version >= 1 {
            decoder.read_bool()?
        } else {
            false
        };
        let partition_count = decoder.read_i32()?;
        if partition_count < 0 {
            return Err(Error::Protocol(format!(
                "Negative partition count: {}",
                partition_count
            )));
        }
        let mut partitions = Vec::with_capacity(partition_count as usize);
        for _ in 0..partition_count {
            partitions.push(MetadataPartition::decode(decoder, version)?);
        }
        Ok(MetadataTopic {
            error_code,
            name,
            is_internal,
            partitions,
        })
    }
}

/// Metadata response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataResponse {
    /// Broker metadata
    pub brokers: Vec<MetadataBroker>,
    /// Controller node ID (v1+; -1 on v0)
    pub controller_id: BrokerId,
    /// Topic metadata
    pub topics: Vec<MetadataTopic>,
}

impl MetadataResponse {
    /// Look up a broker by its node id.
    pub fn broker(&self, node_id: BrokerId) -> Option<&MetadataBroker> {
        self.brokers.iter().find(|b| b.node_id == node_id)
    }
}

impl KafkaEncodable for MetadataResponse {
    fn encode(&self, encoder: &mut Encoder<'_>, version: i16) -> Result<()> {
        check_version(version)?;
        encoder.write_i32(self.brokers.len() as i32);
        for broker in &self.brokers {
            broker.encode(encoder, version)?;
        }
        if version >= 1 {
            encoder.write_i32(self.controller_id);
        }
        encoder.write_i32(self.topics.len() as i32);
        for topic in &self.topics {
            topic.encode(encoder, version)?;
        }
        Ok(())
    }
}

impl KafkaDecodable for MetadataResponse {
    fn decode(decoder: &mut Decoder<'_>, version: i16) -> Result<Self> {
        check_version(version)?;
        let broker_count = decoder.read_i32()?;
        if broker_count < 0 {
            return Err(Error::Protocol(format!(
                "Negative broker count: {}",
                broker_count
            )));
        }
        let mut brokers = Vec::with_capacity(broker_count as usize);
        for _ in 0..broker_count {
            brokers.push(MetadataBroker::decode(decoder, version)?);
        }
        let controller_id = if version >= 1 { decoder.read_i32()? } else { -1 };
        let topic_count = decoder.read_i32()?;
        if topic_count < 0 {
            return Err(Error::Protocol(format!(
                "Negative topic count: {}",
                topic_count
            )));
        }
        let mut topics = Vec::with_capacity(topic_count as usize);
        for _ in 0..topic_count {
            topics.push(MetadataTopic::decode(decoder, version)?);
        }
        Ok(MetadataResponse {
            brokers,
            controller_id,
            topics,
        })
    }
}
