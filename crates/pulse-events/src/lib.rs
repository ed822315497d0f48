//! Topic and message vocabulary for the realtime update channel.
//!
//! This crate carries no I/O: it defines the closed set of topics the
//! product pushes over the realtime channel, the inbound/outbound wire
//! envelopes, and the typed subscription announcements a client sends to
//! tell the server what it is listening for.

mod announce;
mod message;
mod topic;

pub use announce::Announce;
pub use message::{EventEnvelope, OutboundMessage};
pub use topic::Topic;
