//! ZooKeeper jute wire format.
//!
//! The client protocol serializes records with jute: numbers big-endian,
//! strings as i32 length + UTF-8 bytes, buffers as i32 length + raw bytes,
//! -1 length meaning null. Every message travels inside the same 4-byte
//! length framing the Kafka side uses (`tailpin_common::frame`).
//!
//! Only the records needed for a read/overwrite session are implemented:
//! connect handshake, request/reply headers, getData and setData.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, ZkError};

/// Operation codes for the requests this client sends.
pub mod opcodes {
    pub const GET_DATA: i32 = 4;
    pub const SET_DATA: i32 = 5;
    pub const PING: i32 = 11;
    pub const CLOSE_SESSION: i32 = -11;
}

/// Session password length fixed by the protocol.
pub const PASSWD_LEN: usize = 16;

/// Jute primitive reader
pub struct JuteReader<'a> {
    buf: &'a mut (dyn Buf + Send),
}

impl<'a> JuteReader<'a> {
    pub fn new(buf: &'a mut (dyn Buf + Send)) -> Self {
        Self { buf }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        if self.buf.remaining() < 1 {
            return Err(ZkError::Protocol("Not enough bytes for bool".into()));
        }
        Ok(self.buf.get_u8() != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        if self.buf.remaining() < 4 {
            return Err(ZkError::Protocol("Not enough bytes for i32".into()));
        }
        Ok(self.buf.get_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        if self.buf.remaining() < 8 {
            return Err(ZkError::Protocol("Not enough bytes for i64".into()));
        }
        Ok(self.buf.get_i64())
    }

    /// Read a ustring. Null strings do not occur in the records we read.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(ZkError::Protocol("Unexpected null string".into()));
        }
        let len = len as usize;
        if self.buf.remaining() < len {
            return Err(ZkError::Protocol(format!(
                "Not enough bytes for string of length {}",
                len
            )));
        }
        let mut bytes = vec![0u8; len];
        self.buf.copy_to_slice(&mut bytes);
        String::from_utf8(bytes).map_err(|e| ZkError::Protocol(format!("Invalid UTF-8: {}", e)))
    }

    /// Read a buffer (null = -1 length)
    pub fn read_buffer(&mut self) -> Result<Option<Vec<u8>>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        let len = len as usize;
        if self.buf.remaining() < len {
            return Err(ZkError::Protocol(format!(
                "Not enough bytes for buffer of length {}",
                len
            )));
        }
        let mut bytes = vec![0u8; len];
        self.buf.copy_to_slice(&mut bytes);
        Ok(Some(bytes))
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}

/// Jute primitive writer
pub struct JuteWriter<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> JuteWriter<'a> {
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(if value { 1 } else { 0 });
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_i32(value.len() as i32);
        self.buf.put_slice(value.as_bytes());
    }

    pub fn write_buffer(&mut self, value: Option<&[u8]>) {
        match value {
            Some(bytes) => {
                self.write_i32(bytes.len() as i32);
                self.buf.put_slice(bytes);
            }
            None => self.write_i32(-1),
        }
    }
}

/// Session handshake request. Unlike data requests it travels without a
/// request header.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub protocol_version: i32,
    pub last_zxid_seen: i64,
    pub timeout_ms: i32,
    pub session_id: i64,
    pub passwd: Vec<u8>,
}

impl ConnectRequest {
    /// Fresh session with the given requested timeout.
    pub fn new(timeout_ms: i32) -> Self {
        Self {
            protocol_version: 0,
            last_zxid_seen: 0,
            timeout_ms,
            session_id: 0,
            passwd: vec![0u8; PASSWD_LEN],
        }
    }

    pub fn encode(&self, w: &mut JuteWriter<'_>) {
        w.write_i32(self.protocol_version);
        w.write_i64(self.last_zxid_seen);
        w.write_i32(self.timeout_ms);
        w.write_i64(self.session_id);
        w.write_buffer(Some(&self.passwd));
    }

    pub fn decode(r: &mut JuteReader<'_>) -> Result<Self> {
        Ok(Self {
            protocol_version: r.read_i32()?,
            last_zxid_seen: r.read_i64()?,
            timeout_ms: r.read_i32()?,
            session_id: r.read_i64()?,
            passwd: r.read_buffer()?.unwrap_or_default(),
        })
    }
}

/// Session handshake response.
#[derive(Debug, Clone)]
pub struct ConnectResponse {
    pub protocol_version: i32,
    pub timeout_ms: i32,
    pub session_id: i64,
    pub passwd: Vec<u8>,
}

impl ConnectResponse {
    pub fn encode(&self, w: &mut JuteWriter<'_>) {
        w.write_i32(self.protocol_version);
        w.write_i32(self.timeout_ms);
        w.write_i64(self.session_id);
        w.write_buffer(Some(&self.passwd));
    }

    /// Decode, tolerating the trailing read-only flag newer servers append.
    pub fn decode(r: &mut JuteReader<'_>) -> Result<Self> {
        let response = Self {
            protocol_version: r.read_i32()?,
            timeout_ms: r.read_i32()?,
            session_id: r.read_i64()?,
            passwd: r.read_buffer()?.unwrap_or_default(),
        };
        if r.remaining() >= 1 {
            let _read_only = r.read_bool()?;
        }
        Ok(response)
    }
}

/// Header preceding every request after the handshake.
#[derive(Debug, Clone)]
pub struct RequestHeader {
    pub xid: i32,
    pub opcode: i32,
}

impl RequestHeader {
    pub fn encode(&self, w: &mut JuteWriter<'_>) {
        w.write_i32(self.xid);
        w.write_i32(self.opcode);
    }

    pub fn decode(r: &mut JuteReader<'_>) -> Result<Self> {
        Ok(Self {
            xid: r.read_i32()?,
            opcode: r.read_i32()?,
        })
    }
}

/// Header preceding every reply after the handshake.
#[derive(Debug, Clone)]
pub struct ReplyHeader {
    pub xid: i32,
    pub zxid: i64,
    pub err: i32,
}

impl ReplyHeader {
    pub fn encode(&self, w: &mut JuteWriter<'_>) {
        w.write_i32(self.xid);
        w.write_i64(self.zxid);
        w.write_i32(self.err);
    }

    pub fn decode(r: &mut JuteReader<'_>) -> Result<Self> {
        Ok(Self {
            xid: r.read_i32()?,
            zxid: r.read_i64()?,
            err: r.read_i32()?,
        })
    }
}

/// Znode metadata returned alongside data reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stat {
    pub czxid: i64,
    pub mzxid: i64,
    pub ctime: i64,
    pub mtime: i64,
    pub version: i32,
    pub cversion: i32,
    pub aversion: i32,
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
    pub pzxid: i64,
}

impl Stat {
    pub fn encode(&self, w: &mut JuteWriter<'_>) {
        w.write_i64(self.czxid);
        w.write_i64(self.mzxid);
        w.write_i64(self.ctime);
        w.write_i64(self.mtime);
        w.write_i32(self.version);
        w.write_i32(self.cversion);
        w.write_i32(self.aversion);
        w.write_i64(self.ephemeral_owner);
        w.write_i32(self.data_length);
        w.write_i32(self.num_children);
        w.write_i64(self.pzxid);
    }

    pub fn decode(r: &mut JuteReader<'_>) -> Result<Self> {
        Ok(Self {
            czxid: r.read_i64()?,
            mzxid: r.read_i64()?,
            ctime: r.read_i64()?,
            mtime: r.read_i64()?,
            version: r.read_i32()?,
            cversion: r.read_i32()?,
            aversion: r.read_i32()?,
            ephemeral_owner: r.read_i64()?,
            data_length: r.read_i32()?,
            num_children: r.read_i32()?,
            pzxid: r.read_i64()?,
        })
    }
}

/// getData request body.
#[derive(Debug, Clone)]
pub struct GetDataRequest {
    pub path: String,
    pub watch: bool,
}

impl GetDataRequest {
    pub fn encode(&self, w: &mut JuteWriter<'_>) {
        w.write_string(&self.path);
        w.write_bool(self.watch);
    }

    pub fn decode(r: &mut JuteReader<'_>) -> Result<Self> {
        Ok(Self {
            path: r.read_string()?,
            watch: r.read_bool()?,
        })
    }
}

/// getData response body.
#[derive(Debug, Clone)]
pub struct GetDataResponse {
    pub data: Option<Vec<u8>>,
    pub stat: Stat,
}

impl GetDataResponse {
    pub fn encode(&self, w: &mut JuteWriter<'_>) {
        w.write_buffer(self.data.as_deref());
        self.stat.encode(w);
    }

    pub fn decode(r: &mut JuteReader<'_>) -> Result<Self> {
        Ok(Self {
            data: r.read_buffer()?,
            stat: Stat::decode(r)?,
        })
    }
}

/// setData request body. Version -1 writes unconditionally.
#[derive(Debug, Clone)]
pub struct SetDataRequest {
    pub path: String,
    pub data: Vec<u8>,
    pub version: i32,
}

impl SetDataRequest {
    pub fn encode(&self, w: &mut JuteWriter<'_>) {
        w.write_string(&self.path);
        w.write_buffer(Some(&self.data));
        w.write_i32(self.version);
    }

    pub fn decode(r: &mut JuteReader<'_>) -> Result<Self> {
        Ok(Self {
            path: r.read_string()?,
            data: r.read_buffer()?.unwrap_or_default(),
            version: r.read_i32()?,
        })
    }
}

/// setData response body.
#[derive(Debug, Clone)]
pub struct SetDataResponse {
    pub stat: Stat,
}

impl SetDataResponse {
    pub fn encode(&self, w: &mut JuteWriter<'_>) {
        self.stat.encode(w);
    }

    pub fn decode(r: &mut JuteReader<'_>) -> Result<Self> {
        Ok(Self {
            stat: Stat::decode(r)?,
        })
    }
}
