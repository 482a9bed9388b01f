//! Minimal ZooKeeper session client.
//!
//! Opens one session against the first reachable host of the connect
//! string and issues synchronous getData/setData calls over it, one
//! request in flight at a time. Watches, authentication and ephemeral
//! state are out of scope. Session establishment is retried with
//! exponential backoff; individual data operations are not.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use tailpin_common::FrameCodec;

use crate::codec::{
    opcodes, ConnectRequest, ConnectResponse, GetDataRequest, GetDataResponse, JuteReader,
    JuteWriter, ReplyHeader, RequestHeader, SetDataRequest, SetDataResponse, Stat,
};
use crate::error::{Result, ZkError};
use crate::retry::{retry_async_with_backoff, RetryConfig};

/// Default session timeout requested from the server.
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 60_000;

/// Default per-request timeout, also used for the TCP connect.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Connection settings for a ZooKeeper session.
#[derive(Debug, Clone)]
pub struct ZkConfig {
    /// host:port entries to try, in order
    pub hosts: Vec<String>,
    pub session_timeout: Duration,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl ZkConfig {
    /// Parse a `host:port,host:port` connect string.
    pub fn from_connect_string(connect: &str) -> Result<Self> {
        let hosts: Vec<String> = connect
            .split(',')
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        if hosts.is_empty() {
            return Err(ZkError::InvalidConnectString(connect.to_string()));
        }
        Ok(Self {
            hosts,
            session_timeout: Duration::from_millis(DEFAULT_SESSION_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            retry: RetryConfig::default(),
        })
    }
}

/// A single established ZooKeeper session.
#[derive(Debug)]
pub struct ZkClient {
    framed: Framed<TcpStream, FrameCodec>,
    request_timeout: Duration,
    session_id: i64,
    negotiated_timeout: Duration,
    xid: i32,
}

impl ZkClient {
    /// Establish a session, retrying transient failures with backoff.
    pub async fn connect(config: &ZkConfig) -> Result<Self> {
        retry_async_with_backoff(config.retry.clone(), "zookeeper connect", || {
            Self::connect_once(config)
        })
        .await
    }

    /// One pass over the host list; first successful handshake wins.
    async fn connect_once(config: &ZkConfig) -> Result<Self> {
        let mut last_error = None;
        for host in &config.hosts {
            match Self::handshake(host, config).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    warn!(%host, "ZooKeeper handshake failed: {}", e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ZkError::ConnectionLoss("no hosts to try".into())))
    }

    async fn handshake(host: &str, config: &ZkConfig) -> Result<Self> {
        let stream = timeout(config.request_timeout, TcpStream::connect(host))
            .await
            .map_err(|_| ZkError::Timeout(format!("connecting to {}", host)))??;
        stream.set_nodelay(true)?;

        let mut framed = Framed::new(stream, FrameCodec::new());

        let request = ConnectRequest::new(config.session_timeout.as_millis() as i32);
        let mut buf = BytesMut::new();
        request.encode(&mut JuteWriter::new(&mut buf));
        framed.send(buf.freeze()).await?;

        let mut frame = match timeout(config.request_timeout, framed.next()).await {
            Ok(Some(frame)) => frame?,
            Ok(None) => {
                return Err(ZkError::ConnectionLoss(format!(
                    "{} closed the connection during handshake",
                    host
                )))
            }
            Err(_) => return Err(ZkError::Timeout(format!("handshake with {}", host))),
        };

        let mut reader = JuteReader::new(&mut frame);
        let response = ConnectResponse::decode(&mut reader)?;
        if response.timeout_ms <= 0 {
            return Err(ZkError::ConnectionLoss(format!(
                "{} refused the session",
                host
            )));
        }

        info!(
            %host,
            session_id = response.session_id,
            negotiated_timeout_ms = response.timeout_ms,
            "ZooKeeper session established"
        );

        Ok(Self {
            framed,
            request_timeout: config.request_timeout,
            session_id: response.session_id,
            negotiated_timeout: Duration::from_millis(response.timeout_ms as u64),
            xid: 0,
        })
    }

    /// Session id assigned by the server.
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// Session timeout granted by the server.
    pub fn negotiated_timeout(&self) -> Duration {
        self.negotiated_timeout
    }

    fn next_xid(&mut self) -> i32 {
        self.xid += 1;
        self.xid
    }

    /// Read the data stored at a znode.
    pub async fn get_data(&mut self, path: &str) -> Result<(Option<Vec<u8>>, Stat)> {
        let xid = self.next_xid();
        let mut buf = BytesMut::new();
        {
            let mut w = JuteWriter::new(&mut buf);
            RequestHeader {
                xid,
                opcode: opcodes::GET_DATA,
            }
            .encode(&mut w);
            GetDataRequest {
                path: path.to_string(),
                watch: false,
            }
            .encode(&mut w);
        }

        let mut body = self.exchange(buf.freeze(), xid, path).await?;
        let mut reader = JuteReader::new(&mut body);
        let response = GetDataResponse::decode(&mut reader)?;
        debug!(
            path,
            bytes = response.data.as_ref().map(|d| d.len()).unwrap_or(0),
            version = response.stat.version,
            "read znode"
        );
        Ok((response.data, response.stat))
    }

    /// Overwrite the data at a znode regardless of its current version.
    pub async fn set_data(&mut self, path: &str, data: &[u8]) -> Result<Stat> {
        let xid = self.next_xid();
        let mut buf = BytesMut::new();
        {
            let mut w = JuteWriter::new(&mut buf);
            RequestHeader {
                xid,
                opcode: opcodes::SET_DATA,
            }
            .encode(&mut w);
            SetDataRequest {
                path: path.to_string(),
                data: data.to_vec(),
                version: -1,
            }
            .encode(&mut w);
        }

        let mut body = self.exchange(buf.freeze(), xid, path).await?;
        let mut reader = JuteReader::new(&mut body);
        let response = SetDataResponse::decode(&mut reader)?;
        debug!(path, version = response.stat.version, "wrote znode");
        Ok(response.stat)
    }

    /// Close the session. The server acknowledges before dropping the
    /// connection; a connection already gone counts as closed.
    pub async fn close(mut self) -> Result<()> {
        let xid = self.next_xid();
        let mut buf = BytesMut::new();
        RequestHeader {
            xid,
            opcode: opcodes::CLOSE_SESSION,
        }
        .encode(&mut JuteWriter::new(&mut buf));

        let result = timeout(self.request_timeout, async {
            self.framed.send(buf.freeze()).await?;
            match self.framed.next().await {
                Some(frame) => {
                    let mut frame = frame?;
                    let mut reader = JuteReader::new(&mut frame);
                    ReplyHeader::decode(&mut reader)?;
                    Ok(())
                }
                None => Ok(()),
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(ZkError::Timeout("session close".into())),
        }
    }

    /// Send one framed request and return the reply body past its header.
    async fn exchange(&mut self, request: Bytes, xid: i32, path: &str) -> Result<Bytes> {
        let reply = timeout(self.request_timeout, async {
            self.framed.send(request).await?;
            match self.framed.next().await {
                Some(frame) => Ok(frame?),
                None => Err(ZkError::ConnectionLoss(format!(
                    "connection closed waiting for reply on {}",
                    path
                ))),
            }
        })
        .await
        .map_err(|_| ZkError::Timeout(format!("request for {}", path)))??;

        let mut frame = reply;
        let mut reader = JuteReader::new(&mut frame);
        let header = ReplyHeader::decode(&mut reader)?;
        if header.xid != xid {
            return Err(ZkError::Protocol(format!(
                "xid mismatch: sent {}, received {}",
                xid, header.xid
            )));
        }
        if header.err != 0 {
            return Err(ZkError::from_code(header.err, path));
        }
        Ok(frame)
    }
}
