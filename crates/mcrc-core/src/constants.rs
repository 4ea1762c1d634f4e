//! Protocol constants for the MCRC transport layer.

/// Largest payload a single packet may carry. Both the wire prefix and the
/// in-stream prefix encode lengths as unsigned 16-bit values.
pub const MAX_PACKET_SIZE: usize = 65_535;

/// Size of the fixed length prefix used inside a
/// [`PacketStream`](crate::stream::PacketStream).
pub const PACKET_HEADER_LEN: usize = 2;

/// Wire prefix byte marking an extended (16-bit) length.
pub const LENGTH_ESCAPE: u8 = 0xFF;

/// Payload lengths below this fit the single-byte wire prefix.
pub const SHORT_LENGTH_LIMIT: usize = 0xFF;

/// Default ring capacity of a packet stream.
///
/// Must exceed `MAX_PACKET_SIZE + PACKET_HEADER_LEN` (plus the one ring
/// byte kept reserved) so that a maximum-size packet always fits an empty
/// stream.
pub const DEFAULT_STREAM_CAPACITY: usize = 0x20000;
