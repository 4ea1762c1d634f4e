//! Channel liveness switch.
//!
//! Every channel needs the same pieces of shutdown plumbing:
//!
//! - a way for the owner to tell both workers to stop,
//! - a way for either worker to flag the connection as broken so the owner
//!   knows teardown is wanted.
//!
//! [`EnableFlag`] bundles a `watch` channel for the stop signal with an
//! `AtomicBool` for the broken marker. Clearing the flag is the only
//! sanctioned way a worker loop ends; a broken connection on its own never
//! terminates a sender.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// The liveness switch shared by a channel and its two workers.
///
/// Workers hold a subscription to the stop signal and race it against their
/// blocking points in `tokio::select!`, so a disable is observed within one
/// polling interval at most.
pub struct EnableFlag {
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    broken: AtomicBool,
}

impl EnableFlag {
    /// Create a flag in the enabled, not-broken state.
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            stop_tx,
            stop_rx,
            broken: AtomicBool::new(false),
        }
    }

    /// Get a new subscription to the stop signal. Each worker holds its own
    /// receiver and checks it in a `tokio::select!` branch.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Whether the channel is still enabled.
    pub fn is_enabled(&self) -> bool {
        !*self.stop_rx.borrow()
    }

    /// Clear the flag, telling both workers to exit. Idempotent.
    pub fn disable(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Record that a worker observed a fatal transport fault. The channel
    /// stays allocated until its owner closes it; it just stops moving
    /// packets.
    pub fn mark_broken(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// Whether a worker has requested teardown.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }
}

impl Default for EnableFlag {
    fn default() -> Self {
        Self::new()
    }
}
