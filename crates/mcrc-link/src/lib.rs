//! Multi-channel reliable communication links.
//!
//! The lowest layer of the networking code: a server keeps one [`Link`] per
//! connected client, a client keeps a single link to the server, and each
//! link is composed of independent [`Channel`]s. Every channel is backed by
//! its own stream transport and driven by its own pair of concurrent
//! sender/receiver tasks; all of a link's receivers deposit into one shared
//! inbound packet stream that the application drains on its own schedule.

pub mod channel;
pub mod error;
pub mod link;
pub mod shutdown;
pub mod testing;

pub use channel::Channel;
pub use error::{ChannelError, LinkError};
pub use link::{Link, LinkTable, DEFAULT_MAX_LINKS, MAX_CHANNELS};
pub use shutdown::EnableFlag;
