use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use async_trait::async_trait;
use tracing::trace;

use crate::connection::{Connection, EventListenerFn, ListenerId};
use crate::error::TransportError;
use crate::event::{Event, EventValue};

struct Registration {
    id: ListenerId,
    listener: EventListenerFn,
}

#[derive(Default)]
struct ListenerTable {
    by_event: HashMap<String, Vec<Registration>>,
    events_by_id: HashMap<ListenerId, Vec<String>>,
}

/// In-process [`Connection`] endpoint.
///
/// Endpoints come in connected pairs: `emit` on one side dispatches to the
/// listeners registered on the other, in emit order, awaiting each listener
/// before the next event is accepted. Used by tests and by callers wiring
/// producer and consumer inside one process.
pub struct LocalConnection {
    table: Mutex<ListenerTable>,
    peer: OnceLock<Weak<LocalConnection>>,
}

impl LocalConnection {
    fn unconnected() -> Self {
        Self {
            table: Mutex::new(ListenerTable::default()),
            peer: OnceLock::new(),
        }
    }

    /// Two endpoints connected to each other.
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let a = Arc::new(Self::unconnected());
        let b = Arc::new(Self::unconnected());
        let _ = a.peer.set(Arc::downgrade(&b));
        let _ = b.peer.set(Arc::downgrade(&a));
        (a, b)
    }

    /// An endpoint connected to itself: emits dispatch to its own listeners.
    /// Handy when one object plays both sender and receiver.
    pub fn loopback() -> Arc<Self> {
        let conn = Arc::new(Self::unconnected());
        let _ = conn.peer.set(Arc::downgrade(&conn));
        conn
    }

    async fn dispatch(&self, event: Event) {
        // Snapshot under the lock, await outside it: listeners may remove
        // themselves (or others) while running.
        let matching: Vec<EventListenerFn> = {
            let table = self.table.lock().unwrap();
            table
                .by_event
                .get(&event.name)
                .map(|regs| regs.iter().map(|r| r.listener.clone()).collect())
                .unwrap_or_default()
        };
        if matching.is_empty() {
            trace!(event = %event.name, "no listener, event dropped");
            return;
        }
        for listener in matching {
            listener(event.clone()).await;
        }
    }
}

#[async_trait]
impl Connection for LocalConnection {
    async fn emit(&self, event: &str, args: Vec<EventValue>) -> Result<(), TransportError> {
        let peer = self
            .peer
            .get()
            .and_then(Weak::upgrade)
            .ok_or(TransportError::Closed)?;
        peer.dispatch(Event {
            name: event.to_string(),
            args,
        })
        .await;
        Ok(())
    }

    fn add_listener(&self, id: ListenerId, events: &[String], listener: EventListenerFn) {
        let mut table = self.table.lock().unwrap();
        for event in events {
            table.by_event.entry(event.clone()).or_default().push(Registration {
                id,
                listener: listener.clone(),
            });
        }
        table.events_by_id.insert(id, events.to_vec());
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut table = self.table.lock().unwrap();
        let Some(events) = table.events_by_id.remove(&id) else {
            return false;
        };
        for event in events {
            if let Some(regs) = table.by_event.get_mut(&event) {
                regs.retain(|r| r.id != id);
                if regs.is_empty() {
                    table.by_event.remove(&event);
                }
            }
        }
        true
    }

    fn listener_count(&self, event: &str) -> usize {
        let table = self.table.lock().unwrap();
        table.by_event.get(event).map_or(0, Vec::len)
    }
}
