//! Stream semantics over a connection that only carries discrete events.
//!
//! Some transports speak named events, not byte streams. This crate layers
//! ordered, chunked streams on top of one: the sender opens an
//! [`OutboundStream`] whose writes become `stream:<id>:data` events and
//! whose completion becomes a single `stream:<id>:end` event; the receiver
//! registers for an application-chosen initiation event and gets a matching
//! [`InboundStream`] per announced channel id. Neither side ever holds a
//! whole payload in memory: chunks flow through a bounded buffer, and a
//! full buffer backpressures the emitter.
//!
//! The application-level contract: the sender announces the channel id
//! (plus any metadata) through an initiation event of its choosing, and the
//! receiver must be registered for that event before the announce, or the
//! initiation is missed. See [`StreamLayer`] for a worked example.
//!
//! Chunk order per channel matches write order — both sides ride the
//! connection's own ordered dispatch. No ordering is promised between
//! distinct channels.

mod channel_id;
mod error;
mod facade;
mod inbound;
mod outbound;
mod registrar;

pub use channel_id::ChannelId;
pub use error::StreamError;
pub use facade::{DEFAULT_HIGH_WATER_MARK, StreamConfig, StreamLayer};
pub use inbound::InboundStream;
pub use outbound::OutboundStream;
pub use registrar::StreamHandler;

pub use event_link::{Connection, Event, EventValue, ListenerHandle, ListenerId, TransportError};
