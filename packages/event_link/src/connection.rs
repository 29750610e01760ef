use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::trace;

use crate::error::TransportError;
use crate::event::{Event, EventValue};

/// An async event listener. `emit` awaits the returned future before
/// dispatching to the next listener, so listeners are the flow-control
/// point: parking on a bounded channel here backpressures the emitter.
pub type EventListenerFn = Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one listener registration.
///
/// Ids are allocated process-wide by the registering side, so a listener
/// closure can capture its own id before the registration is visible to
/// dispatch — there is no window where an event could reach a listener
/// that does not yet know how to remove itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The shared bidirectional event channel between two peers.
///
/// One registration may cover several event names; it is dispatched for any
/// of them and removed as a unit. Events with no matching listener are
/// dropped silently.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Deliver `args` under `event` to every listener currently registered
    /// for that name, in registration order.
    async fn emit(&self, event: &str, args: Vec<EventValue>) -> Result<(), TransportError>;

    /// Register `listener` under `id` for each name in `events`.
    fn add_listener(&self, id: ListenerId, events: &[String], listener: EventListenerFn);

    /// Remove the registration for `id` from every event name it covers.
    /// Returns false if it was already removed.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Number of live registrations for `event`. Used by leak diagnostics
    /// and tests.
    fn listener_count(&self, event: &str) -> usize;
}

/// Owns one listener registration and releases it exactly once.
///
/// The handle replaces "remove all listeners for a computed event name":
/// removal goes through the stored [`ListenerId`], so cleanup cannot miss
/// because of a naming mismatch, and a second release is a no-op. Dropping
/// an unreleased handle releases it.
pub struct ListenerHandle {
    conn: Arc<dyn Connection>,
    id: ListenerId,
    released: AtomicBool,
}

impl ListenerHandle {
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        Self {
            conn,
            id: ListenerId::next(),
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Register `listener` for `events` under this handle's id.
    pub fn register(&self, events: &[String], listener: EventListenerFn) {
        self.conn.add_listener(self.id, events, listener);
    }

    /// Keep the registration alive without this handle: after `detach`,
    /// dropping (or releasing) the handle no longer removes it, and the
    /// registration lasts as long as the connection keeps it.
    pub fn detach(&self) {
        self.released.store(true, Ordering::Release);
    }

    /// Remove the registration. Idempotent; returns true only on the call
    /// that actually removed it.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        let removed = self.conn.remove_listener(self.id);
        trace!(id = ?self.id, removed, "listener registration released");
        removed
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_ids_are_unique() {
        let a = ListenerId::next();
        let b = ListenerId::next();
        assert_ne!(a, b);
    }
}
