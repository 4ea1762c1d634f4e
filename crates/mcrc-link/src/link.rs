//! Links and the peer-indexed link table.
//!
//! A [`Link`] is the aggregate communication endpoint toward one peer: a
//! fixed set of channel slots plus a single shared inbound stream that
//! every channel's receiver deposits into. A [`LinkTable`] manages link
//! lifecycles by peer slot: open, close (which cascades channel teardown),
//! and shutdown of everything at once.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info};

use mcrc_core::stream::PacketStream;

use crate::channel::Channel;
use crate::error::LinkError;

/// Number of channel slots per link.
pub const MAX_CHANNELS: usize = 4;

/// Default number of peer slots in a [`LinkTable`].
pub const DEFAULT_MAX_LINKS: usize = 16;

/// The communication endpoint toward one peer.
pub struct Link {
    slot: usize,
    inbound: Arc<PacketStream>,
    channels: [Option<Channel>; MAX_CHANNELS],
}

impl Link {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            inbound: Arc::new(PacketStream::new()),
            channels: std::array::from_fn(|_| None),
        }
    }

    /// The peer slot this link occupies in its table.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Associate a new transport connection with this link.
    ///
    /// Scans the channel slots for a free one; fails with
    /// [`LinkError::Denied`] when all are taken, in which case the caller
    /// should close the connection and forget about it. On success the
    /// channel's sender and receiver workers start immediately and the
    /// channel index is returned.
    pub fn open_channel<R, W>(&mut self, reader: R, writer: W) -> Result<usize, LinkError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Some(index) = self.channels.iter().position(Option::is_none) else {
            return Err(LinkError::Denied);
        };

        let label = format!("link {} channel {}", self.slot, index);
        let channel = Channel::open(reader, writer, Arc::clone(&self.inbound), label);
        self.channels[index] = Some(channel);

        info!("link {}: opened channel {}", self.slot, index);
        Ok(index)
    }

    /// Attach a connected TCP stream as a new channel.
    pub fn open_channel_tcp(&mut self, stream: TcpStream) -> Result<usize, LinkError> {
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();
        self.open_channel(reader, writer)
    }

    /// Disable a channel and wait until both of its workers have exited.
    /// The channel's resources are released only after the join.
    pub async fn close_channel(&mut self, index: usize) -> Result<(), LinkError> {
        let slot = self
            .channels
            .get_mut(index)
            .ok_or(LinkError::ChannelNotOpen(index))?;
        let Some(mut channel) = slot.take() else {
            return Err(LinkError::ChannelNotOpen(index));
        };

        channel.close().await;
        debug!("link {}: closed channel {}", self.slot, index);
        Ok(())
    }

    /// Queue a packet on a channel's outbound stream. The packet will be
    /// picked up by that channel's sender worker.
    pub fn enqueue_outbound(&self, index: usize, data: &[u8]) -> Result<(), LinkError> {
        let channel = self
            .channels
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(LinkError::ChannelNotOpen(index))?;
        channel.outbound().try_put_packet(data)?;
        Ok(())
    }

    /// Take the next packet from the shared inbound stream, if any. Never
    /// blocks; the application drains on its own schedule.
    pub fn poll_inbound(&self) -> Option<Vec<u8>> {
        self.inbound.try_get_packet()
    }

    /// Whether the given channel slot holds an open channel.
    pub fn channel_is_open(&self, index: usize) -> bool {
        self.channels
            .get(index)
            .map(Option::is_some)
            .unwrap_or(false)
    }

    /// Whether a channel's workers have requested teardown, or `None` if
    /// the channel is not open. A broken channel no longer delivers inbound
    /// packets; it is up to the owner to close and possibly replace it.
    pub fn channel_is_broken(&self, index: usize) -> Option<bool> {
        self.channels
            .get(index)
            .and_then(Option::as_ref)
            .map(Channel::is_broken)
    }

    /// Number of currently open channels.
    pub fn open_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.is_some()).count()
    }

    /// Close every live channel on this link.
    async fn close(&mut self) {
        for index in 0..MAX_CHANNELS {
            if self.channels[index].is_some() {
                let _ = self.close_channel(index).await;
            }
        }
    }
}

/// Fixed-size slot table managing link lifecycles, indexed by peer number.
///
/// A slot is either empty or holds exactly one live link; opening an
/// already-open slot is an error, never a silent overwrite.
pub struct LinkTable {
    links: Vec<Option<Link>>,
}

impl LinkTable {
    /// Create a table with the given number of peer slots.
    pub fn new(slots: usize) -> Self {
        Self {
            links: (0..slots).map(|_| None).collect(),
        }
    }

    /// Number of peer slots in the table.
    pub fn slots(&self) -> usize {
        self.links.len()
    }

    /// Open a link at `slot`. Initializes the inbound stream and the empty
    /// channel slots, but opens no channels — peers open as many as they
    /// want, within [`MAX_CHANNELS`].
    ///
    /// Fails with [`LinkError::SlotAlreadyOpen`] when the slot holds a live
    /// link; that indicates a lifecycle-tracking bug upstream.
    pub fn open_link(&mut self, slot: usize) -> Result<&mut Link, LinkError> {
        let entry = self
            .links
            .get_mut(slot)
            .ok_or(LinkError::SlotOutOfRange(slot))?;
        if entry.is_some() {
            return Err(LinkError::SlotAlreadyOpen(slot));
        }

        info!("link {slot}: opened");
        Ok(entry.insert(Link::new(slot)))
    }

    /// Shared access to the link at `slot`, if open.
    pub fn link(&self, slot: usize) -> Option<&Link> {
        self.links.get(slot).and_then(Option::as_ref)
    }

    /// Exclusive access to the link at `slot`, if open.
    pub fn link_mut(&mut self, slot: usize) -> Option<&mut Link> {
        self.links.get_mut(slot).and_then(Option::as_mut)
    }

    /// Close the link at `slot`, shutting down all of its channels first.
    /// A no-op when the slot is empty or out of range.
    pub async fn close_link(&mut self, slot: usize) {
        let Some(entry) = self.links.get_mut(slot) else {
            return;
        };
        let Some(mut link) = entry.take() else {
            return;
        };

        link.close().await;
        info!("link {slot}: closed");
    }

    /// Close every open link; used at process shutdown.
    pub async fn shutdown_all(&mut self) {
        for slot in 0..self.links.len() {
            self.close_link(slot).await;
        }
    }
}

impl Default for LinkTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINKS)
    }
}
