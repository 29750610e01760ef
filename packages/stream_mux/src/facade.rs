use std::sync::{Arc, Mutex, Weak};

use event_link::{Connection, EventValue};
use tracing::debug;

use crate::inbound::InboundStream;
use crate::outbound::OutboundStream;
use crate::registrar;

/// Default pending-chunk buffer per inbound stream, in chunks. Once full,
/// delivery parks inside the emitter until the consumer drains.
pub const DEFAULT_HIGH_WATER_MARK: usize = 64;

/// Tunables for streams on one wrapped connection.
#[derive(Clone, Copy, Debug)]
pub struct StreamConfig {
    pub high_water_mark: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}

struct Inner {
    conn: Arc<dyn Connection>,
    config: StreamConfig,
}

/// Registry of live facades, keyed by connection identity. Wrapping the
/// same connection twice must hand back the same inner state, so registrar
/// listeners exist at most once per connection; an explicit weak registry
/// does that without planting marker members on the connection.
static WRAPPED: Mutex<Vec<(Weak<dyn Connection>, Weak<Inner>)>> = Mutex::new(Vec::new());

/// Entry point: stream semantics over a shared event connection.
///
/// Cloning is cheap and clones share state. Registrations made through
/// [`on`](Self::on) belong to the connection and keep listening even after
/// every facade for it is dropped.
///
/// ```
/// use bytes::Bytes;
/// use event_link::{Connection, EventValue, LocalConnection};
/// use stream_mux::StreamLayer;
///
/// tokio::runtime::Runtime::new().unwrap().block_on(async {
///     let (sender_conn, receiver_conn) = LocalConnection::pair();
///
///     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
///     StreamLayer::wrap(receiver_conn).on("file", move |mut stream, _metadata| {
///         let tx = tx.clone();
///         tokio::spawn(async move {
///             let mut bytes = Vec::new();
///             while let Some(chunk) = stream.recv().await {
///                 bytes.extend_from_slice(&chunk);
///             }
///             let _ = tx.send(bytes);
///         });
///     });
///
///     let sender = StreamLayer::wrap(sender_conn.clone());
///     let mut stream = sender.create_stream();
///     sender_conn
///         .emit("file", vec![EventValue::from(stream.channel_id().as_str())])
///         .await
///         .unwrap();
///     stream.write(Bytes::from_static(b"payload")).await.unwrap();
///     stream.finish().await.unwrap();
///
///     assert_eq!(rx.recv().await.unwrap(), b"payload");
/// });
/// ```
#[derive(Clone)]
pub struct StreamLayer {
    inner: Arc<Inner>,
}

impl StreamLayer {
    /// Wrap `conn` with default [`StreamConfig`].
    pub fn wrap(conn: Arc<dyn Connection>) -> Self {
        Self::wrap_with(conn, StreamConfig::default())
    }

    /// Wrap `conn`, idempotently per connection instance: wrapping an
    /// already-wrapped connection returns a facade sharing the existing
    /// state, and `config` of the first wrap wins.
    pub fn wrap_with(conn: Arc<dyn Connection>, config: StreamConfig) -> Self {
        let mut wrapped = WRAPPED.lock().unwrap();
        wrapped.retain(|(c, i)| c.strong_count() > 0 && i.strong_count() > 0);
        for (candidate, inner) in wrapped.iter() {
            if let (Some(existing), Some(inner)) = (candidate.upgrade(), inner.upgrade()) {
                if Arc::ptr_eq(&existing, &conn) {
                    debug!("connection already wrapped, reusing stream layer");
                    return Self { inner };
                }
            }
        }
        let inner = Arc::new(Inner {
            conn: conn.clone(),
            config,
        });
        wrapped.push((Arc::downgrade(&conn), Arc::downgrade(&inner)));
        Self { inner }
    }

    /// Open the write side of a fresh stream channel. The caller announces
    /// its channel id at the application level.
    pub fn create_stream(&self) -> OutboundStream {
        OutboundStream::new(self.inner.conn.clone())
    }

    /// Register `handler` for initiation events named `event`. Each firing
    /// hands the handler one reconstructed [`InboundStream`] plus the
    /// initiation's metadata. Returns `&Self` for chaining.
    ///
    /// The registration is keyed to the connection, not to this facade:
    /// it keeps listening after every facade clone is gone, so
    /// `StreamLayer::wrap(conn).on(...)` as a bare expression is fine.
    pub fn on<F>(&self, event: &str, handler: F) -> &Self
    where
        F: Fn(InboundStream, Vec<EventValue>) + Send + Sync + 'static,
    {
        let handle = registrar::register(
            self.inner.conn.clone(),
            event,
            self.inner.config.high_water_mark,
            Arc::new(handler),
        );
        handle.detach();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use event_link::LocalConnection;

    #[tokio::test]
    async fn wrap_is_idempotent_per_connection() {
        let conn = LocalConnection::loopback();
        let conn_dyn: Arc<dyn Connection> = conn.clone();

        let first = StreamLayer::wrap(conn_dyn.clone());
        let second = StreamLayer::wrap(conn_dyn);
        assert!(Arc::ptr_eq(&first.inner, &second.inner));
    }

    #[tokio::test]
    async fn distinct_connections_get_distinct_layers() {
        let (a, b) = LocalConnection::pair();
        let first = StreamLayer::wrap(a);
        let second = StreamLayer::wrap(b);
        assert!(!Arc::ptr_eq(&first.inner, &second.inner));
    }

    #[tokio::test]
    async fn wrapping_twice_does_not_duplicate_handler_calls() {
        let conn = LocalConnection::loopback();
        let first = StreamLayer::wrap(conn.clone());
        let _second = StreamLayer::wrap(conn.clone());

        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            first.on("file", move |_stream, _metadata| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        conn.emit("file", vec![EventValue::from("some-channel")])
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn registrations_outlive_the_facade() {
        let conn = LocalConnection::loopback();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            let layer = StreamLayer::wrap(conn.clone());
            layer.on("file", move |_stream, _metadata| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(conn.listener_count("file"), 1);

        conn.emit("file", vec![EventValue::from("some-channel")])
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrapping_as_a_temporary_keeps_listening() {
        let conn = LocalConnection::loopback();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            // The facade here is a temporary, gone at the end of the
            // statement; the registration must not go with it.
            StreamLayer::wrap(conn.clone()).on("file", move |_stream, _metadata| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(conn.listener_count("file"), 1);

        conn.emit("file", vec![EventValue::from("some-channel")])
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn on_supports_chaining() {
        let conn = LocalConnection::loopback();
        let layer = StreamLayer::wrap(conn.clone());
        layer
            .on("file", |_stream, _metadata| {})
            .on("log", |_stream, _metadata| {});
        assert_eq!(conn.listener_count("file"), 1);
        assert_eq!(conn.listener_count("log"), 1);
    }
}
