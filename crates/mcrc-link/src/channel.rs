//! Communication channels and their worker tasks.
//!
//! Each channel owns one transport connection and is driven by two
//! concurrent tasks: a sender that drains the channel's outbound
//! [`PacketStream`] onto the wire, and a receiver that decodes wire frames
//! and deposits whole packets into the owning link's shared inbound stream.
//! The two workers share nothing beyond the enable flag — the sender only
//! writes the transport and the receiver only reads it.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use mcrc_core::framing::{frame_packet, FrameAccumulator};
use mcrc_core::stream::PacketStream;

use crate::error::ChannelError;
use crate::shutdown::EnableFlag;

/// How long the sender naps when the outbound stream is empty. A small
/// fixed wait keeps enqueue-to-send latency low without busy-spinning.
pub const SEND_IDLE_WAIT: Duration = Duration::from_millis(5);

/// Size of the receiver's chunk buffer for transport reads.
pub const RECV_CHUNK_SIZE: usize = 4096;

/// One transport connection bound to a link slot, together with its
/// outbound stream and the two worker tasks that drive it.
///
/// The workers own the transport halves outright and hold their own
/// references to the streams, so none of those resources can be released
/// until both tasks have been joined by [`close`](Self::close).
pub struct Channel {
    outbound: Arc<PacketStream>,
    flag: Arc<EnableFlag>,
    sender: Option<JoinHandle<()>>,
    receiver: Option<JoinHandle<()>>,
}

impl Channel {
    /// Allocate channel resources and start both workers on the given
    /// transport halves. The receiver deposits decoded packets into
    /// `inbound`, the owning link's shared stream.
    pub(crate) fn open<R, W>(
        reader: R,
        writer: W,
        inbound: Arc<PacketStream>,
        label: String,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let outbound = Arc::new(PacketStream::new());
        let flag = Arc::new(EnableFlag::new());

        let send_stream = Arc::clone(&outbound);
        let send_flag = Arc::clone(&flag);
        let send_label = label.clone();
        let sender = tokio::spawn(async move {
            send_loop(writer, send_stream, &send_flag, &send_label).await;
            debug!("{send_label}: sender stopped");
        });

        let recv_flag = Arc::clone(&flag);
        let receiver = tokio::spawn(async move {
            if let Err(e) = recv_loop(reader, inbound, &recv_flag, &label).await {
                warn!("{label}: receiver fault, channel marked for teardown: {e}");
                recv_flag.mark_broken();
            }
            debug!("{label}: receiver stopped");
        });

        Self {
            outbound,
            flag,
            sender: Some(sender),
            receiver: Some(receiver),
        }
    }

    /// The stream of outgoing packets waiting to be sent.
    pub fn outbound(&self) -> &PacketStream {
        &self.outbound
    }

    /// Whether the channel is still enabled (its owner has not closed it).
    pub fn is_enabled(&self) -> bool {
        self.flag.is_enabled()
    }

    /// Whether a worker observed a fatal transport fault and requested
    /// teardown. A broken channel keeps its resources until closed; it just
    /// stops moving packets.
    pub fn is_broken(&self) -> bool {
        self.flag.is_broken()
    }

    /// Disable the channel and wait for both workers to exit. Resources are
    /// released strictly after the join, never before.
    pub(crate) async fn close(&mut self) {
        self.flag.disable();
        if let Some(handle) = self.sender.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.receiver.take() {
            let _ = handle.await;
        }
    }
}

/// Sender worker: pop packets from the outbound stream and write them,
/// wire-framed, to the transport.
///
/// A write fault marks the channel broken but does not end the loop — the
/// enable flag is the only sanctioned exit. Once broken, popped packets are
/// discarded instead of written.
async fn send_loop<W>(
    mut writer: W,
    outbound: Arc<PacketStream>,
    flag: &EnableFlag,
    label: &str,
) where
    W: AsyncWrite + Unpin,
{
    let mut stop_rx = flag.subscribe();

    while flag.is_enabled() {
        let Some(packet) = outbound.try_get_packet() else {
            // Nothing queued: nap briefly so enqueuers get a turn, waking
            // immediately if the channel is disabled meanwhile.
            tokio::select! {
                _ = tokio::time::sleep(SEND_IDLE_WAIT) => {}
                _ = stop_rx.changed() => {}
            }
            continue;
        };

        if flag.is_broken() {
            // The transport already failed; keep draining without writing.
            continue;
        }

        let frame = match frame_packet(&packet) {
            Ok(frame) => frame,
            Err(e) => {
                // Streams cap packets at the same 16-bit limit, so this is
                // unreachable through the public surface.
                warn!("{label}: dropping unframeable packet: {e}");
                continue;
            }
        };

        tokio::select! {
            result = writer.write_all(&frame) => {
                if let Err(e) = result {
                    warn!("{label}: send failed: {}", ChannelError::ConnectionBroken(e));
                    flag.mark_broken();
                }
            }
            _ = stop_rx.changed() => break,
        }
    }
}

/// Receiver worker: read transport bytes, reassemble wire frames, and push
/// each completed packet into the link's shared inbound stream.
///
/// Any fatal condition (EOF, read error, inbound stream full) ends the loop
/// immediately; the wrapper task marks the channel broken.
async fn recv_loop<R>(
    mut reader: R,
    inbound: Arc<PacketStream>,
    flag: &EnableFlag,
    label: &str,
) -> Result<(), ChannelError>
where
    R: AsyncRead + Unpin,
{
    let mut stop_rx = flag.subscribe();
    let mut acc = FrameAccumulator::new();
    let mut buf = vec![0u8; RECV_CHUNK_SIZE];

    while flag.is_enabled() {
        let n = tokio::select! {
            result = reader.read(&mut buf) => match result? {
                0 => {
                    debug!("{label}: connection closed by peer");
                    return Err(ChannelError::ConnectionBroken(
                        std::io::ErrorKind::UnexpectedEof.into(),
                    ));
                }
                n => n,
            },
            _ = stop_rx.changed() => break,
        };

        for packet in acc.feed(&buf[..n]) {
            inbound.try_put_packet(&packet).map_err(ChannelError::InboundFull)?;
        }
    }

    Ok(())
}
