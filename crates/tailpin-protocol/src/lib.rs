//! Client-side Kafka wire protocol support for tailpin.
//!
//! This crate provides:
//! - Request/response headers and the API keys the tool uses
//! - Wire primitive encoding and decoding (`wire`)
//! - Metadata and ListOffsets codecs for protocol versions 0-1
//! - The broker error codes those APIs return
//!
//! Framing (the 4-byte length prefix around every message) lives in
//! `tailpin_common::frame`; everything here operates on unframed payloads.

pub mod error_codes;
pub mod list_offsets;
pub mod metadata;
pub mod wire;

use bytes::{Buf, BytesMut};
use tailpin_common::{Error, Result};

pub use wire::{Decoder, Encoder, KafkaDecodable, KafkaEncodable};

/// Kafka API keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ApiKey {
    ListOffsets = 2,
    Metadata = 3,
}

impl ApiKey {
    /// Try to create an ApiKey from an i16
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            2 => Some(ApiKey::ListOffsets),
            3 => Some(ApiKey::Metadata),
            _ => None,
        }
    }
}

/// Kafka request header
#[derive(Debug, Clone)]
pub struct RequestHeader {
    pub api_key: ApiKey,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

/// Kafka response header
#[derive(Debug, Clone)]
pub struct ResponseHeader {
    pub correlation_id: i32,
}

/// Write a request header to bytes
pub fn write_request_header(buf: &mut BytesMut, header: &RequestHeader) {
    let mut encoder = Encoder::new(buf);
    encoder.write_i16(header.api_key as i16);
    encoder.write_i16(header.api_version);
    encoder.write_i32(header.correlation_id);
    encoder.write_string(header.client_id.as_deref());
}

/// Parse a request header from bytes
pub fn parse_request_header(buf: &mut dyn Buf) -> Result<RequestHeader> {
    let mut decoder = Decoder::new(buf);

    let api_key_raw = decoder.read_i16()?;
    let api_key = ApiKey::from_i16(api_key_raw)
        .ok_or_else(|| Error::Protocol(format!("Unknown API key: {}", api_key_raw)))?;

    let api_version = decoder.read_i16()?;
    let correlation_id = decoder.read_i32()?;
    let client_id = decoder.read_string()?;

    Ok(RequestHeader {
        api_key,
        api_version,
        correlation_id,
        client_id,
    })
}

/// Write a response header to bytes
pub fn write_response_header(buf: &mut BytesMut, header: &ResponseHeader) {
    let mut encoder = Encoder::new(buf);
    encoder.write_i32(header.correlation_id);
}

/// Parse a response header from bytes
pub fn parse_response_header(buf: &mut dyn Buf) -> Result<ResponseHeader> {
    let mut decoder = Decoder::new(buf);
    let correlation_id = decoder.read_i32()?;
    Ok(ResponseHeader { correlation_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_header_roundtrip() {
        let header = RequestHeader {
            api_key: ApiKey::Metadata,
            api_version: 0,
            correlation_id: 7,
            client_id: Some("leader-lookup-1".into()),
        };

        let mut buf = BytesMut::new();
        write_request_header(&mut buf, &header);

        // api_key + api_version + correlation_id + client_id length + bytes
        assert_eq!(buf.len(), 2 + 2 + 4 + 2 + 15);
        assert_eq!(&buf[..2], &[0x00, 0x03]);

        let mut bytes = buf.freeze();
        let parsed = parse_request_header(&mut bytes).unwrap();
        assert_eq!(parsed.api_key, ApiKey::Metadata);
        assert_eq!(parsed.correlation_id, 7);
        assert_eq!(parsed.client_id.as_deref(), Some("leader-lookup-1"));
    }

    #[test]
    fn request_header_null_client_id() {
        let header = RequestHeader {
            api_key: ApiKey::ListOffsets,
            api_version: 0,
            correlation_id: 1,
            client_id: None,
        };

        let mut buf = BytesMut::new();
        write_request_header(&mut buf, &header);
        assert_eq!(buf.len(), 2 + 2 + 4 + 2);

        let mut bytes = buf.freeze();
        let parsed = parse_request_header(&mut bytes).unwrap();
        assert_eq!(parsed.api_key, ApiKey::ListOffsets);
        assert_eq!(parsed.client_id, None);
    }

    #[test]
    fn unknown_api_key_is_rejected() {
        let mut buf = BytesMut::new();
        let mut encoder = Encoder::new(&mut buf);
        encoder.write_i16(999);
        encoder.write_i16(0);
        encoder.write_i32(1);
        encoder.write_string(None);

        let mut bytes = buf.freeze();
        assert!(parse_request_header(&mut bytes).is_err());
    }

    #[test]
    fn response_header_roundtrip() {
        let mut buf = BytesMut::new();
        write_response_header(&mut buf, &ResponseHeader { correlation_id: 42 });
        assert_eq!(buf.as_ref(), [0x00, 0x00, 0x00, 0x2a]);

        let mut bytes = buf.freeze();
        let parsed = parse_response_header(&mut bytes).unwrap();
        assert_eq!(parsed.correlation_id, 42);
    }
}
