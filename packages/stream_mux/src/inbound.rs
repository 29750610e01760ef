use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use event_link::{Connection, EventListenerFn, EventValue, ListenerHandle};
use futures::{FutureExt, Stream};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::channel_id::ChannelId;

/// Read side of one multiplexed stream channel.
///
/// Reconstructed from the channel-scoped `data`/`end` events: chunks arrive
/// in emit order through a bounded buffer, and after the end event
/// [`recv`](Self::recv) drains whatever is buffered and then returns `None`.
/// Also usable as a `futures::Stream` of chunks.
///
/// The adapter holds exactly one listener registration on the connection,
/// covering both of its event names. The registration is released when the
/// end event arrives, or when the stream is dropped early — whichever comes
/// first — so finished streams leave no listeners behind.
pub struct InboundStream {
    channel_id: ChannelId,
    rx: mpsc::Receiver<Bytes>,
    handle: Arc<ListenerHandle>,
}

impl InboundStream {
    /// Attach to `conn` and start buffering chunks for `channel_id`.
    ///
    /// `high_water_mark` bounds the pending-chunk buffer; once it is full,
    /// chunk delivery parks inside the emitter's `emit`, so a slow consumer
    /// backpressures the producer instead of growing memory.
    pub(crate) fn attach(
        conn: Arc<dyn Connection>,
        channel_id: ChannelId,
        high_water_mark: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Bytes>(high_water_mark);
        let handle = Arc::new(ListenerHandle::new(conn));
        let data_event = channel_id.data_event();
        let end_event = channel_id.end_event();

        // The master sender lives here; taking it on end closes the buffer
        // once in-flight clones finish, which is what recv() observes as
        // end-of-stream.
        let tx = Arc::new(Mutex::new(Some(tx)));
        let listener: EventListenerFn = {
            let handle = handle.clone();
            let channel = channel_id.clone();
            let data_event = data_event.clone();
            Arc::new(move |event| {
                let tx = tx.clone();
                let handle = handle.clone();
                let channel = channel.clone();
                let is_data = event.name == data_event;
                async move {
                    if is_data {
                        let Some(sender) = tx.lock().unwrap().clone() else {
                            return;
                        };
                        match event.args.into_iter().next() {
                            Some(EventValue::Binary(chunk)) => {
                                if sender.send(chunk).await.is_err() {
                                    trace!(channel = %channel, "consumer gone, chunk dropped");
                                }
                            }
                            _ => {
                                warn!(channel = %channel, "non-binary chunk payload dropped");
                            }
                        }
                    } else {
                        debug!(channel = %channel, "inbound stream channel ended");
                        tx.lock().unwrap().take();
                        handle.release();
                    }
                }
                .boxed()
            })
        };
        handle.register(&[data_event, end_event], listener);

        debug!(channel = %channel_id, "inbound stream channel attached");
        Self {
            channel_id,
            rx,
            handle,
        }
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Next chunk, or `None` once the end event has arrived and the buffer
    /// is drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl Stream for InboundStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for InboundStream {
    fn drop(&mut self) {
        // Early drop by the consumer; on the normal path the end event
        // already released it and this is a no-op.
        self.handle.release();
    }
}
