//! Lock-protected circular packet buffer.
//!
//! A [`PacketStream`] stores a FIFO queue of discrete packets in a
//! fixed-capacity ring of bytes. Each packet is recorded as a 2-byte
//! little-endian length prefix followed by its payload; both may wrap
//! around the end of the backing buffer. Producers append whole packets and
//! consumers remove whole packets — a partial packet never crosses the API
//! boundary.
//!
//! Streams are shared between worker tasks and the main thread, so every
//! operation acquires the stream's lock for its full duration. The lock is
//! never held across blocking I/O.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::constants::{DEFAULT_STREAM_CAPACITY, MAX_PACKET_SIZE, PACKET_HEADER_LEN};
use crate::error::StreamError;

/// Ring state: backing storage plus the write (`head`) and read (`tail`)
/// cursors. One byte is always kept reserved so `head == tail` is
/// unambiguously "empty".
struct Ring {
    buf: Box<[u8]>,
    head: usize,
    tail: usize,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Unused space in bytes, excluding the reserved byte.
    fn free(&self) -> usize {
        let used = if self.head >= self.tail {
            self.head - self.tail
        } else {
            self.capacity() - self.tail + self.head
        };
        self.capacity() - used - 1
    }

    /// Copy `data` in at `head`, continuing at offset 0 when the data
    /// straddles the end of the buffer. The caller has checked free space.
    fn write(&mut self, data: &[u8]) {
        let cap = self.capacity();
        let first = data.len().min(cap - self.head);
        self.buf[self.head..self.head + first].copy_from_slice(&data[..first]);
        if first < data.len() {
            self.buf[..data.len() - first].copy_from_slice(&data[first..]);
        }
        self.head = (self.head + data.len()) % cap;
    }

    /// Copy `out.len()` bytes out from `tail`, honoring wraparound. The
    /// caller has checked that the bytes are present.
    fn read(&mut self, out: &mut [u8]) {
        let cap = self.capacity();
        let len = out.len();
        let first = len.min(cap - self.tail);
        out[..first].copy_from_slice(&self.buf[self.tail..self.tail + first]);
        if first < len {
            out[first..].copy_from_slice(&self.buf[..len - first]);
        }
        self.tail = (self.tail + len) % cap;
    }
}

/// A thread-safe FIFO of length-prefixed packets over a circular byte
/// buffer.
///
/// One stream carries a channel's outgoing packets; another, shared by all
/// of a link's channels, aggregates incoming packets. The inbound stream is
/// the one many-writer structure in the system, which is why the stream
/// carries its own lock instead of relying on single-writer assumptions.
pub struct PacketStream {
    ring: Mutex<Ring>,
}

impl PacketStream {
    /// Create a stream with [`DEFAULT_STREAM_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_STREAM_CAPACITY)
    }

    /// Create a stream with an explicit ring capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` cannot hold a maximum-size packet plus its
    /// prefix and the reserved ring byte. This is checked once here, never
    /// per packet.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity > MAX_PACKET_SIZE + PACKET_HEADER_LEN,
            "stream capacity {capacity} cannot hold a maximum-size packet"
        );
        Self {
            ring: Mutex::new(Ring {
                buf: vec![0u8; capacity].into_boxed_slice(),
                head: 0,
                tail: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a whole packet: 2-byte little-endian length prefix, then the
    /// payload.
    ///
    /// Fails with [`StreamError::BufferFull`] when free space is smaller
    /// than `data.len() + 2`; nothing is written on failure.
    pub fn try_put_packet(&self, data: &[u8]) -> Result<(), StreamError> {
        if data.len() > MAX_PACKET_SIZE {
            return Err(StreamError::PacketTooLarge {
                len: data.len(),
                max: MAX_PACKET_SIZE,
            });
        }

        let mut ring = self.lock();
        let needed = data.len() + PACKET_HEADER_LEN;
        let free = ring.free();
        if free < needed {
            return Err(StreamError::BufferFull { needed, free });
        }

        let header = (data.len() as u16).to_le_bytes();
        ring.write(&header);
        ring.write(data);
        Ok(())
    }

    /// Remove and return the next packet, or `None` when the stream is
    /// empty. Never blocks.
    pub fn try_get_packet(&self) -> Option<Vec<u8>> {
        let mut ring = self.lock();
        if ring.is_empty() {
            return None;
        }

        let mut header = [0u8; PACKET_HEADER_LEN];
        ring.read(&mut header);
        let length = u16::from_le_bytes(header) as usize;

        let mut payload = vec![0u8; length];
        ring.read(&mut payload);
        Some(payload)
    }

    /// Whether the stream holds no packets.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remaining capacity in bytes (one ring byte stays reserved).
    pub fn free_bytes(&self) -> usize {
        self.lock().free()
    }

    /// Total ring capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}

impl Default for PacketStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_ring(capacity: usize) -> Ring {
        Ring {
            buf: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
        }
    }

    #[test]
    fn ring_free_space_accounting() {
        let mut ring = small_ring(16);
        assert_eq!(ring.free(), 15);

        ring.write(&[1, 2, 3, 4]);
        assert_eq!(ring.free(), 11);

        let mut out = [0u8; 4];
        ring.read(&mut out);
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(ring.free(), 15);
    }

    #[test]
    fn ring_write_and_read_straddle_the_end() {
        let mut ring = small_ring(8);

        // Advance both cursors near the end.
        ring.write(&[0; 6]);
        let mut sink = [0u8; 6];
        ring.read(&mut sink);
        assert_eq!(ring.head, 6);
        assert_eq!(ring.tail, 6);

        // This write wraps: two bytes at the end, three at the front.
        ring.write(&[10, 11, 12, 13, 14]);
        assert_eq!(ring.head, 3);

        let mut out = [0u8; 5];
        ring.read(&mut out);
        assert_eq!(out, [10, 11, 12, 13, 14]);
        assert_eq!(ring.tail, 3);
    }

    #[test]
    fn ring_free_when_head_wrapped_behind_tail() {
        let mut ring = small_ring(8);
        ring.write(&[0; 5]);
        let mut sink = [0u8; 5];
        ring.read(&mut sink);

        // head wraps to 2, tail stays at 5: used = 4, free = 3.
        ring.write(&[1, 2, 3, 4]);
        assert!(ring.head < ring.tail);
        assert_eq!(ring.free(), 3);
    }

    #[test]
    fn put_then_get_roundtrips() {
        let stream = PacketStream::new();
        assert!(stream.is_empty());

        stream.try_put_packet(b"hello").unwrap();
        assert!(!stream.is_empty());

        assert_eq!(stream.try_get_packet().unwrap(), b"hello");
        assert!(stream.is_empty());
        assert!(stream.try_get_packet().is_none());
    }

    #[test]
    fn packets_come_out_in_fifo_order() {
        let stream = PacketStream::new();
        for i in 0..10u8 {
            stream.try_put_packet(&[i; 33]).unwrap();
        }
        for i in 0..10u8 {
            assert_eq!(stream.try_get_packet().unwrap(), vec![i; 33]);
        }
        assert!(stream.is_empty());
    }

    #[test]
    fn zero_length_packet_roundtrips() {
        let stream = PacketStream::new();
        stream.try_put_packet(&[]).unwrap();
        assert!(!stream.is_empty());
        assert_eq!(stream.try_get_packet().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn maximum_size_packet_fits_an_empty_stream() {
        let stream = PacketStream::new();
        let payload = vec![0x5A; MAX_PACKET_SIZE];
        stream.try_put_packet(&payload).unwrap();
        assert_eq!(stream.try_get_packet().unwrap(), payload);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let stream = PacketStream::new();
        let result = stream.try_put_packet(&vec![0; MAX_PACKET_SIZE + 1]);
        assert!(matches!(
            result,
            Err(StreamError::PacketTooLarge { .. })
        ));
        assert!(stream.is_empty());
    }

    #[test]
    fn buffer_full_leaves_the_stream_unchanged() {
        let stream = PacketStream::new();

        // Fill until a put is refused.
        let filler = vec![0xA7; 50_000];
        let mut stored = 0;
        loop {
            match stream.try_put_packet(&filler) {
                Ok(()) => stored += 1,
                Err(StreamError::BufferFull { needed, free }) => {
                    assert!(free < needed);
                    break;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        let free_before = stream.free_bytes();
        let result = stream.try_put_packet(&filler);
        assert!(matches!(result, Err(StreamError::BufferFull { .. })));
        assert_eq!(stream.free_bytes(), free_before);

        // Everything stored earlier is still intact, in order.
        for _ in 0..stored {
            assert_eq!(stream.try_get_packet().unwrap(), filler);
        }
        assert!(stream.is_empty());
    }

    #[test]
    fn packets_survive_wraparound() {
        let stream = PacketStream::new();
        let capacity = stream.capacity();

        // Push enough traffic through to wrap the cursors several times.
        let mut moved = 0usize;
        let mut counter = 0u8;
        while moved < capacity * 3 {
            let payload: Vec<u8> = (0..40_000)
                .map(|i| counter.wrapping_add(i as u8))
                .collect();
            stream.try_put_packet(&payload).unwrap();
            assert_eq!(stream.try_get_packet().unwrap(), payload);
            moved += payload.len() + PACKET_HEADER_LEN;
            counter = counter.wrapping_add(1);
        }
        assert!(stream.is_empty());
        assert_eq!(stream.free_bytes(), capacity - 1);
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        use std::sync::Arc;

        const WRITERS: usize = 4;
        const PACKETS_PER_WRITER: usize = 64;

        let stream = Arc::new(PacketStream::new());

        let handles: Vec<_> = (0..WRITERS)
            .map(|writer| {
                let stream = Arc::clone(&stream);
                std::thread::spawn(move || {
                    for seq in 0..PACKETS_PER_WRITER {
                        let payload = [writer as u8, seq as u8, 0xEE, 0xFF];
                        stream.try_put_packet(&payload).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Drain: exactly WRITERS * PACKETS_PER_WRITER packets, each intact,
        // and each writer's own sequence still in order.
        let mut next_seq = [0usize; WRITERS];
        let mut total = 0;
        while let Some(packet) = stream.try_get_packet() {
            assert_eq!(packet.len(), 4);
            let writer = packet[0] as usize;
            assert_eq!(packet[1] as usize, next_seq[writer]);
            assert_eq!(&packet[2..], &[0xEE, 0xFF]);
            next_seq[writer] += 1;
            total += 1;
        }
        assert_eq!(total, WRITERS * PACKETS_PER_WRITER);
        assert!(next_seq.iter().all(|&n| n == PACKETS_PER_WRITER));
    }

    #[test]
    #[should_panic(expected = "cannot hold a maximum-size packet")]
    fn undersized_capacity_is_refused_at_construction() {
        let _ = PacketStream::with_capacity(0x10000);
    }
}
