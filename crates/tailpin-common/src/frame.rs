//! Length-prefixed frame handling.
//!
//! Both protocols this tool speaks (Kafka wire protocol and the ZooKeeper
//! client protocol) frame every message the same way:
//! - [Length: i32 big-endian][MessagePayload]
//!
//! The codec yields the payload without the length prefix.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Maximum frame size (64MB) to prevent OOM on a corrupt length prefix
const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Minimum frame size - the smallest payload either protocol produces is a
/// single 32-bit field
const MIN_FRAME_SIZE: usize = 4;

/// Length-prefixed frame decoder/encoder
#[derive(Debug)]
pub struct FrameCodec {
    /// Maximum allowed frame size
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a new frame codec with default settings
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Create a new frame codec with custom max frame size
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        // Need at least 4 bytes for the length prefix
        if src.len() < 4 {
            trace!("Not enough data for length prefix, have {} bytes", src.len());
            return Ok(None);
        }

        // Peek at the length without consuming
        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&src[..4]);
        let length = i32::from_be_bytes(length_bytes) as usize;

        // Validate frame size
        if length < MIN_FRAME_SIZE {
            return Err(Error::Protocol(format!(
                "Frame size {} is below minimum {}",
                length, MIN_FRAME_SIZE
            )));
        }

        if length > self.max_frame_size {
            return Err(Error::Protocol(format!(
                "Frame size {} exceeds maximum {}",
                length, self.max_frame_size
            )));
        }

        // Check if we have the complete frame
        if src.len() < 4 + length {
            trace!(
                "Waiting for complete frame, have {} bytes, need {}",
                src.len(),
                4 + length
            );
            // Reserve capacity for the complete frame
            src.reserve(4 + length - src.len());
            return Ok(None);
        }

        // We have a complete frame
        debug!("Decoding frame of {} bytes", length);

        // Skip the length prefix
        src.advance(4);

        // Extract the frame data
        let frame = src.split_to(length).freeze();

        Ok(Some(frame))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        let length = item.len();

        // Validate frame size
        if length < MIN_FRAME_SIZE {
            return Err(Error::Protocol(format!(
                "Frame size {} is below minimum {}",
                length, MIN_FRAME_SIZE
            )));
        }

        if length > self.max_frame_size {
            return Err(Error::Protocol(format!(
                "Frame size {} exceeds maximum {}",
                length, self.max_frame_size
            )));
        }

        debug!("Encoding frame of {} bytes", length);

        // Reserve space for length prefix and data
        dst.reserve(4 + length);

        // Write length prefix
        dst.put_i32(length as i32);

        // Write frame data
        dst.put(item);

        Ok(())
    }
}
