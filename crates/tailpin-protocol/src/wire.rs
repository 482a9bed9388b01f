//! Kafka wire protocol primitives.
//!
//! The Kafka protocol encodes numbers big-endian, strings with an i16
//! length prefix (-1 for null) and byte arrays with an i32 length prefix.
//! The versions of the APIs this tool speaks predate the flexible
//! (compact/varint) encodings, so those are not implemented here.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tailpin_common::{Error, Result};

/// Types that can be written to the wire at a given API version.
pub trait KafkaEncodable {
    fn encode(&self, encoder: &mut Encoder<'_>, version: i16) -> Result<()>;
}

/// Types that can be read from the wire at a given API version.
pub trait KafkaDecodable: Sized {
    fn decode(decoder: &mut Decoder<'_>, version: i16) -> Result<Self>;
}

/// Protocol decoder for reading Kafka protocol primitives
pub struct Decoder<'a> {
    buf: &'a mut dyn Buf,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder
    pub fn new(buf: &'a mut dyn Buf) -> Self {
        Self { buf }
    }

    /// Read a boolean
    pub fn read_bool(&mut self) -> Result<bool> {
        if self.buf.remaining() < 1 {
            return Err(Error::Protocol("Not enough bytes for bool".into()));
        }
        Ok(self.buf.get_u8() != 0)
    }

    /// Read an i16
    pub fn read_i16(&mut self) -> Result<i16> {
        if self.buf.remaining() < 2 {
            return Err(Error::Protocol("Not enough bytes for i16".into()));
        }
        Ok(self.buf.get_i16())
    }

    /// Read an i32
    pub fn read_i32(&mut self) -> Result<i32> {
        if self.buf.remaining() < 4 {
            return Err(Error::Protocol("Not enough bytes for i32".into()));
        }
        Ok(self.buf.get_i32())
    }

    /// Read an i64
    pub fn read_i64(&mut self) -> Result<i64> {
        if self.buf.remaining() < 8 {
            return Err(Error::Protocol("Not enough bytes for i64".into()));
        }
        Ok(self.buf.get_i64())
    }

    /// Read a string (null = -1 length)
    pub fn read_string(&mut self) -> Result<Option<String>> {
        let len = self.read_i16()?;
        if len < 0 {
            return Ok(None);
        }

        let len = len as usize;
        if self.buf.remaining() < len {
            return Err(Error::Protocol(format!(
                "Not enough bytes for string of length {}",
                len
            )));
        }

        let mut bytes = vec![0u8; len];
        self.buf.copy_to_slice(&mut bytes);

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| Error::Protocol(format!("Invalid UTF-8 in string: {}", e)))
    }

    /// Read a byte array (null = -1 length)
    pub fn read_bytes(&mut self) -> Result<Option<Bytes>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }

        let len = len as usize;
        if self.buf.remaining() < len {
            return Err(Error::Protocol(format!(
                "Not enough bytes for byte array of length {}",
                len
            )));
        }

        Ok(Some(self.buf.copy_to_bytes(len)))
    }

    /// Read an array of i32 values (used for replica and ISR lists)
    pub fn read_i32_array(&mut self) -> Result<Vec<i32>> {
        let count = self.read_i32()?;
        if count < 0 {
            return Ok(Vec::new());
        }
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(self.read_i32()?);
        }
        Ok(values)
    }

    /// Read an array of i64 values (used for offset lists)
    pub fn read_i64_array(&mut self) -> Result<Vec<i64>> {
        let count = self.read_i32()?;
        if count < 0 {
            return Ok(Vec::new());
        }
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(self.read_i64()?);
        }
        Ok(values)
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}

/// Protocol encoder for writing Kafka protocol primitives
pub struct Encoder<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> Encoder<'a> {
    /// Create a new encoder
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    /// Write a boolean
    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(if value { 1 } else { 0 });
    }

    /// Write an i16
    pub fn write_i16(&mut self, value: i16) {
        self.buf.put_i16(value);
    }

    /// Write an i32
    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    /// Write an i64
    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    /// Write a string (null = None)
    pub fn write_string(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.write_i16(s.len() as i16);
                self.buf.put_slice(s.as_bytes());
            }
            None => {
                self.write_i16(-1);
            }
        }
    }

    /// Write a byte array (null = None)
    pub fn write_bytes(&mut self, value: Option<&[u8]>) {
        match value {
            Some(bytes) => {
                self.write_i32(bytes.len() as i32);
                self.buf.put_slice(bytes);
            }
            None => {
                self.write_i32(-1);
            }
        }
    }

    /// Write an array of i32 values
    pub fn write_i32_array(&mut self, values: &[i32]) {
        self.write_i32(values.len() as i32);
        for value in values {
            self.write_i32(*value);
        }
    }

    /// Write an array of i64 values
    pub fn write_i64_array(&mut self, values: &[i64]) {
        self.write_i32(values.len() as i32);
        for value in values {
            self.write_i64(*value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_encoding() {
        let mut buf = BytesMut::new();
        let mut encoder = Encoder::new(&mut buf);

        encoder.write_string(Some("hello"));
        encoder.write_string(None);
        encoder.write_string(Some(""));

        let mut frozen_buf = buf.freeze();
        let mut decoder = Decoder::new(&mut frozen_buf);
        assert_eq!(decoder.read_string().unwrap(), Some("hello".to_string()));
        assert_eq!(decoder.read_string().unwrap(), None);
        assert_eq!(decoder.read_string().unwrap(), Some(String::new()));
    }

    #[test]
    fn test_bytes_encoding() {
        let mut buf = BytesMut::new();
        let mut encoder = Encoder::new(&mut buf);

        encoder.write_bytes(Some(b"abc"));
        encoder.write_bytes(None);

        let mut frozen_buf = buf.freeze();
        let mut decoder = Decoder::new(&mut frozen_buf);
        assert_eq!(
            decoder.read_bytes().unwrap(),
            Some(Bytes::from_static(b"abc"))
        );
        assert_eq!(decoder.read_bytes().unwrap(), None);
    }

    #[test]
    fn test_array_encoding() {
        let mut buf = BytesMut::new();
        let mut encoder = Encoder::new(&mut buf);

        encoder.write_i32_array(&[1, 2, 3]);
        encoder.write_i64_array(&[42]);
        encoder.write_i64_array(&[]);

        let mut frozen_buf = buf.freeze();
        let mut decoder = Decoder::new(&mut frozen_buf);
        assert_eq!(decoder.read_i32_array().unwrap(), vec![1, 2, 3]);
        assert_eq!(decoder.read_i64_array().unwrap(), vec![42]);
        assert_eq!(decoder.read_i64_array().unwrap(), Vec::<i64>::new());
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn test_truncated_input_is_rejected() {
        let mut buf = BytesMut::new();
        let mut encoder = Encoder::new(&mut buf);
        encoder.write_i16(500); // String length with no payload behind it

        let mut frozen_buf = buf.freeze();
        let mut decoder = Decoder::new(&mut frozen_buf);
        assert!(decoder.read_string().is_err());

        let mut empty = Bytes::new();
        let mut decoder = Decoder::new(&mut empty);
        assert!(decoder.read_i64().is_err());
    }
}
