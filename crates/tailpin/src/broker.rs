//! Single-connection request/response exchange with one Kafka broker.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use tailpin_common::{BrokerEndpoint, Error, FrameCodec, Result};
use tailpin_protocol::{
    parse_response_header, write_request_header, ApiKey, Decoder, Encoder, KafkaDecodable,
    KafkaEncodable, RequestHeader,
};

use crate::config::RunConfig;

/// One TCP connection to a broker with correlation id bookkeeping.
///
/// Requests are issued strictly one at a time, so the next frame on the
/// wire always answers the request just sent.
pub struct BrokerExchange {
    framed: Framed<TcpStream, FrameCodec>,
    endpoint: BrokerEndpoint,
    client_id: String,
    request_timeout: Duration,
    correlation_id: i32,
}

impl BrokerExchange {
    /// Connects to `endpoint` within the configured request timeout.
    pub async fn connect(
        endpoint: &BrokerEndpoint,
        client_id: &str,
        config: &RunConfig,
    ) -> Result<Self> {
        let stream = timeout(config.request_timeout, TcpStream::connect(endpoint.address()))
            .await
            .map_err(|_| Error::Timeout(format!("connecting to broker {endpoint}")))?
            .map_err(|e| Error::Network(format!("connecting to broker {endpoint}: {e}")))?;
        stream.set_nodelay(true)?;

        let framed = Framed::with_capacity(stream, FrameCodec::new(), config.recv_buffer_bytes);
        debug!(broker = %endpoint, client_id, "Connected");

        Ok(Self {
            framed,
            endpoint: endpoint.clone(),
            client_id: client_id.to_string(),
            request_timeout: config.request_timeout,
            correlation_id: 0,
        })
    }

    /// Encodes `request`, sends it and decodes the matching response.
    pub async fn request<Req, Resp>(
        &mut self,
        api_key: ApiKey,
        api_version: i16,
        request: &Req,
    ) -> Result<Resp>
    where
        Req: KafkaEncodable,
        Resp: KafkaDecodable,
    {
        let mut body = BytesMut::new();
        let mut encoder = Encoder::new(&mut body);
        request.encode(&mut encoder, api_version)?;

        let mut frame = self.call(api_key, api_version, body.freeze()).await?;
        let mut decoder = Decoder::new(&mut frame);
        Resp::decode(&mut decoder, api_version)
    }

    /// Sends one raw request body and returns the response body with its
    /// header already consumed and verified.
    pub async fn call(&mut self, api_key: ApiKey, api_version: i16, body: Bytes) -> Result<Bytes> {
        self.correlation_id += 1;
        let header = RequestHeader {
            api_key,
            api_version,
            correlation_id: self.correlation_id,
            client_id: Some(self.client_id.clone()),
        };

        let mut buf = BytesMut::new();
        write_request_header(&mut buf, &header);
        buf.extend_from_slice(&body);
        trace!(
            broker = %self.endpoint,
            ?api_key,
            correlation_id = self.correlation_id,
            bytes = buf.len(),
            "Sending request"
        );

        let mut frame = timeout(self.request_timeout, async {
            self.framed.send(buf.freeze()).await?;
            match self.framed.next().await {
                Some(frame) => frame,
                None => Err(Error::Network(format!(
                    "broker {} closed the connection",
                    self.endpoint
                ))),
            }
        })
        .await
        .map_err(|_| {
            Error::Timeout(format!("{api_key:?} request to broker {}", self.endpoint))
        })??;

        let response = parse_response_header(&mut frame)?;
        if response.correlation_id != self.correlation_id {
            return Err(Error::Protocol(format!(
                "Correlation id mismatch from broker {}: sent {}, received {}",
                self.endpoint, self.correlation_id, response.correlation_id
            )));
        }
        Ok(frame)
    }
}
