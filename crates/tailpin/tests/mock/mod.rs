//! In-process broker and coordination-store doubles for the
//! integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use tailpin_common::{BrokerEndpoint, FrameCodec};
use tailpin_protocol::list_offsets::{
    ListOffsetsRequest, ListOffsetsResponse, ListOffsetsResponsePartition,
    ListOffsetsResponseTopic,
};
use tailpin_protocol::metadata::{MetadataBroker, MetadataRequest, MetadataResponse};
use tailpin_protocol::{
    error_codes, parse_request_header, write_response_header, ApiKey, Decoder, Encoder,
    KafkaDecodable, KafkaEncodable, ResponseHeader,
};
use tailpin_zk::codec::{
    opcodes, ConnectRequest, ConnectResponse, GetDataRequest, GetDataResponse, JuteReader,
    JuteWriter, ReplyHeader, RequestHeader, SetDataRequest, SetDataResponse, Stat, PASSWD_LEN,
};
use tailpin_zk::error::codes;

/// What a scripted broker answers with.
#[derive(Debug, Clone, Default)]
pub struct BrokerScript {
    /// Metadata answer; a broker without one drops metadata connections.
    pub metadata: Option<MetadataResponse>,
    /// Offset answers keyed by topic and partition.
    pub offsets: HashMap<(String, i32), PartitionScript>,
}

#[derive(Debug, Clone)]
pub enum PartitionScript {
    Offsets(Vec<i64>),
    Error(i16),
}

/// A scripted broker bound to a local port. Binding and serving are
/// separate so tests can compose metadata that names the real ports.
pub struct MockBroker {
    listener: TcpListener,
    addr: SocketAddr,
}

impl MockBroker {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self { listener, addr }
    }

    pub fn endpoint(&self) -> BrokerEndpoint {
        BrokerEndpoint::new("127.0.0.1", self.addr.port())
    }

    /// This broker as a metadata answer entry.
    pub fn node(&self, node_id: i32) -> MetadataBroker {
        MetadataBroker {
            node_id,
            host: "127.0.0.1".to_string(),
            port: i32::from(self.addr.port()),
            rack: None,
        }
    }

    pub fn serve(self, script: BrokerScript) {
        tokio::spawn(async move {
            while let Ok((stream, _)) = self.listener.accept().await {
                tokio::spawn(handle_broker_connection(stream, script.clone()));
            }
        });
    }
}

async fn handle_broker_connection(stream: TcpStream, script: BrokerScript) {
    let mut framed = Framed::new(stream, FrameCodec::new());

    while let Some(Ok(mut frame)) = framed.next().await {
        let header = parse_request_header(&mut frame).unwrap();
        let mut out = BytesMut::new();
        write_response_header(
            &mut out,
            &ResponseHeader {
                correlation_id: header.correlation_id,
            },
        );

        match header.api_key {
            ApiKey::Metadata => {
                let mut decoder = Decoder::new(&mut frame);
                MetadataRequest::decode(&mut decoder, header.api_version).unwrap();
                let Some(metadata) = &script.metadata else {
                    return;
                };
                let mut encoder = Encoder::new(&mut out);
                metadata.encode(&mut encoder, header.api_version).unwrap();
            }
            ApiKey::ListOffsets => {
                let mut decoder = Decoder::new(&mut frame);
                let request =
                    ListOffsetsRequest::decode(&mut decoder, header.api_version).unwrap();
                let response = offsets_answer(&script, &request);
                let mut encoder = Encoder::new(&mut out);
                response.encode(&mut encoder, header.api_version).unwrap();
            }
        }

        if framed.send(out.freeze()).await.is_err() {
            return;
        }
    }
}

/// Echoes the request's topics and partitions, filling in scripted
/// offsets. Anything not scripted reads as an unknown partition.
fn offsets_answer(script: &BrokerScript, request: &ListOffsetsRequest) -> ListOffsetsResponse {
    let topics = request
        .topics
        .iter()
        .map(|topic| ListOffsetsResponseTopic {
            name: topic.name.clone(),
            partitions: topic
                .partitions
                .iter()
                .map(|partition| {
                    let scripted = script
                        .offsets
                        .get(&(topic.name.clone(), partition.partition_index));
                    match scripted {
                        Some(PartitionScript::Offsets(offsets)) => ListOffsetsResponsePartition {
                            partition_index: partition.partition_index,
                            error_code: error_codes::NONE,
                            timestamp: -1,
                            offsets: offsets.clone(),
                        },
                        Some(PartitionScript::Error(code)) => ListOffsetsResponsePartition {
                            partition_index: partition.partition_index,
                            error_code: *code,
                            timestamp: -1,
                            offsets: Vec::new(),
                        },
                        None => ListOffsetsResponsePartition {
                            partition_index: partition.partition_index,
                            error_code: error_codes::UNKNOWN_TOPIC_OR_PARTITION,
                            timestamp: -1,
                            offsets: Vec::new(),
                        },
                    }
                })
                .collect(),
        })
        .collect();
    ListOffsetsResponse { topics }
}

/// An endpoint that was bound once and then released, so connections
/// are refused.
pub async fn dead_endpoint() -> BrokerEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    BrokerEndpoint::new("127.0.0.1", addr.port())
}

/// An endpoint that answers every request under the wrong correlation
/// id, with no body behind the header.
pub async fn misaddressed_endpoint() -> BrokerEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut framed = Framed::new(stream, FrameCodec::new());
                while let Some(Ok(mut frame)) = framed.next().await {
                    let header = parse_request_header(&mut frame).unwrap();
                    let mut out = BytesMut::new();
                    write_response_header(
                        &mut out,
                        &ResponseHeader {
                            correlation_id: header.correlation_id + 1,
                        },
                    );
                    if framed.send(out.freeze()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
    BrokerEndpoint::new("127.0.0.1", addr.port())
}

/// An endpoint that accepts connections and then never says a word.
pub async fn silent_endpoint() -> BrokerEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    BrokerEndpoint::new("127.0.0.1", addr.port())
}

pub type Store = Arc<Mutex<HashMap<String, Vec<u8>>>>;

const MOCK_SESSION_ID: i64 = 0x7ee;

/// Spawns a coordination store speaking just enough of the wire
/// protocol for the publisher: connect, get, set, close.
pub async fn spawn_store(store: Store) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle_store_connection(stream, store.clone()));
        }
    });
    addr
}

async fn handle_store_connection(stream: TcpStream, store: Store) {
    let mut framed = Framed::new(stream, FrameCodec::new());

    let Some(Ok(mut frame)) = framed.next().await else {
        return;
    };
    let connect = ConnectRequest::decode(&mut JuteReader::new(&mut frame)).unwrap();
    let response = ConnectResponse {
        protocol_version: 0,
        timeout_ms: connect.timeout_ms,
        session_id: MOCK_SESSION_ID,
        passwd: vec![0u8; PASSWD_LEN],
    };
    let mut buf = BytesMut::new();
    response.encode(&mut JuteWriter::new(&mut buf));
    if framed.send(buf.freeze()).await.is_err() {
        return;
    }

    while let Some(Ok(mut frame)) = framed.next().await {
        let mut reader = JuteReader::new(&mut frame);
        let header = RequestHeader::decode(&mut reader).unwrap();
        let mut out = BytesMut::new();
        let mut close_after_reply = false;

        match header.opcode {
            opcodes::GET_DATA => {
                let request = GetDataRequest::decode(&mut reader).unwrap();
                let data = store.lock().unwrap().get(&request.path).cloned();
                let mut w = JuteWriter::new(&mut out);
                match data {
                    Some(data) => {
                        ReplyHeader {
                            xid: header.xid,
                            zxid: 1,
                            err: 0,
                        }
                        .encode(&mut w);
                        GetDataResponse {
                            stat: Stat {
                                data_length: data.len() as i32,
                                ..Default::default()
                            },
                            data: Some(data),
                        }
                        .encode(&mut w);
                    }
                    None => {
                        ReplyHeader {
                            xid: header.xid,
                            zxid: 1,
                            err: codes::NO_NODE,
                        }
                        .encode(&mut w);
                    }
                }
            }
            opcodes::SET_DATA => {
                let request = SetDataRequest::decode(&mut reader).unwrap();
                let mut w = JuteWriter::new(&mut out);
                let mut locked = store.lock().unwrap();
                match locked.get_mut(&request.path) {
                    // Like the real server, set only updates existing nodes.
                    Some(existing) => {
                        *existing = request.data.clone();
                        ReplyHeader {
                            xid: header.xid,
                            zxid: 2,
                            err: 0,
                        }
                        .encode(&mut w);
                        SetDataResponse {
                            stat: Stat {
                                version: 1,
                                data_length: request.data.len() as i32,
                                ..Default::default()
                            },
                        }
                        .encode(&mut w);
                    }
                    None => {
                        ReplyHeader {
                            xid: header.xid,
                            zxid: 2,
                            err: codes::NO_NODE,
                        }
                        .encode(&mut w);
                    }
                }
            }
            opcodes::CLOSE_SESSION => {
                let mut w = JuteWriter::new(&mut out);
                ReplyHeader {
                    xid: header.xid,
                    zxid: 3,
                    err: 0,
                }
                .encode(&mut w);
                close_after_reply = true;
            }
            other => panic!("unscripted opcode {other}"),
        }

        if framed.send(out.freeze()).await.is_err() {
            return;
        }
        if close_after_reply {
            return;
        }
    }
}
