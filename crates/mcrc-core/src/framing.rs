//! Variable-length wire framing.
//!
//! Packets cross a transport connection as `[prefix][payload]`: a single
//! length byte for payloads shorter than 255 bytes, or the escape byte
//! `0xFF` followed by a 16-bit little-endian length. This is distinct from
//! the fixed 2-byte prefix [`PacketStream`](crate::stream::PacketStream)
//! uses internally — every packet is re-encoded between the two formats on
//! its way through a channel.

use crate::constants::{LENGTH_ESCAPE, MAX_PACKET_SIZE, SHORT_LENGTH_LIMIT};
use crate::error::FramingError;

/// Encode the wire prefix for a payload length. Returns the prefix bytes
/// and how many of them are significant.
fn encode_length(length: usize) -> ([u8; 3], usize) {
    if length < SHORT_LENGTH_LIMIT {
        ([length as u8, 0, 0], 1)
    } else {
        let bytes = (length as u16).to_le_bytes();
        ([LENGTH_ESCAPE, bytes[0], bytes[1]], 3)
    }
}

/// Frame a payload for the wire: length prefix followed by the payload.
pub fn frame_packet(payload: &[u8]) -> Result<Vec<u8>, FramingError> {
    if payload.len() > MAX_PACKET_SIZE {
        return Err(FramingError::PayloadTooLong {
            len: payload.len(),
            max: MAX_PACKET_SIZE,
        });
    }

    let (prefix, prefix_len) = encode_length(payload.len());
    let mut framed = Vec::with_capacity(prefix_len + payload.len());
    framed.extend_from_slice(&prefix[..prefix_len]);
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Stateful accumulator that buffers stream data and extracts complete
/// length-prefixed packets.
///
/// Partial prefixes and payloads are retained across calls to
/// [`feed`](Self::feed), so arbitrary read fragmentation — including a
/// prefix split between two reads — reassembles correctly.
pub struct FrameAccumulator {
    buffer: Vec<u8>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Feed new data from the stream and extract all complete packets.
    ///
    /// Returns the decoded payloads in arrival order. Zero-length packets
    /// are legal and yielded as empty vectors.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(data);

        let mut packets = Vec::new();
        loop {
            let Some((length, prefix_len)) = self.peek_length() else {
                break;
            };
            if self.buffer.len() < prefix_len + length {
                // Payload still incomplete; wait for more data.
                break;
            }

            packets.push(self.buffer[prefix_len..prefix_len + length].to_vec());
            self.buffer.drain(..prefix_len + length);
        }
        packets
    }

    /// Number of buffered bytes not yet part of a completed packet.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Decode the length prefix at the front of the buffer, if it has fully
    /// arrived. Returns `(payload_length, prefix_length)`.
    fn peek_length(&self) -> Option<(usize, usize)> {
        let first = *self.buffer.first()?;
        if first != LENGTH_ESCAPE {
            Some((first as usize, 1))
        } else if self.buffer.len() >= 3 {
            let length = u16::from_le_bytes([self.buffer[1], self.buffer[2]]);
            Some((length as usize, 3))
        } else {
            None
        }
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
