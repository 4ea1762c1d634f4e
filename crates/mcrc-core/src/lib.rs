//! Packet streams and wire framing for the MCRC transport layer.
//!
//! This crate holds the data-plane building blocks of the multi-channel
//! reliable communication layer: the lock-protected circular packet buffer
//! that producers and consumers synchronize on, and the variable-length
//! wire framing used when packets cross a transport connection.

pub mod constants;
pub mod error;
pub mod framing;
pub mod stream;

pub use constants::{DEFAULT_STREAM_CAPACITY, MAX_PACKET_SIZE};
pub use error::{FramingError, StreamError};
pub use framing::{frame_packet, FrameAccumulator};
pub use stream::PacketStream;
