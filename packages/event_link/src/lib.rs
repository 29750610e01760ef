//! Boundary types for a shared bidirectional event-messaging connection.
//!
//! A [`Connection`] carries discrete named events between two peers. Each
//! event has a name and a list of arguments (JSON values or binary blobs).
//! The connection itself — its connect/reconnect lifecycle, any cross-process
//! fan-out — is not modeled here; this crate only defines the surface that
//! higher layers program against, plus [`LocalConnection`], an in-process
//! implementation used for tests and same-process wiring.
//!
//! Listeners are async callbacks. `emit` awaits every matching listener in
//! registration order, so a listener that parks on a bounded channel
//! backpressures the emitter.

mod connection;
mod error;
mod event;
mod local;

pub use connection::{Connection, EventListenerFn, ListenerHandle, ListenerId};
pub use error::TransportError;
pub use event::{Event, EventValue};
pub use local::LocalConnection;
