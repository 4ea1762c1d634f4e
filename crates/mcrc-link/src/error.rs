//! Error types for the link layer.

use mcrc_core::StreamError;

/// Errors surfaced by [`Link`](crate::link::Link) and
/// [`LinkTable`](crate::link::LinkTable) operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// `open_link` hit a slot that already holds a live link. This means
    /// lifecycle tracking upstream has gone wrong; nothing is overwritten.
    #[error("link slot {0} is already open")]
    SlotAlreadyOpen(usize),
    /// The slot index is outside the table.
    #[error("link slot {0} is out of range")]
    SlotOutOfRange(usize),
    /// Every channel slot on the link is taken; the caller should close the
    /// connection it was trying to attach.
    #[error("no free channel slot on this link")]
    Denied,
    /// The channel index does not refer to an open channel.
    #[error("channel {0} is not open")]
    ChannelNotOpen(usize),
    /// A packet stream operation failed (buffer full or packet too large).
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Fatal worker faults. A channel's worker reports one of these before the
/// channel is marked for teardown; faults are never retried inside the
/// worker loop.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Short read/write, reset, or EOF on the transport.
    #[error("connection broken: {0}")]
    ConnectionBroken(#[from] std::io::Error),
    /// The link's inbound stream had no room for a received packet. The
    /// consumer is not draining fast enough; retrying would require an
    /// unbounded backlog, so the channel goes down instead.
    #[error("inbound stream rejected packet: {0}")]
    InboundFull(#[from] StreamError),
}
