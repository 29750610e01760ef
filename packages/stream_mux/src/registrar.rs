use std::sync::Arc;

use event_link::{Connection, EventListenerFn, EventValue, ListenerHandle};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::channel_id::ChannelId;
use crate::inbound::InboundStream;

/// Callback invoked once per initiation event, with the reconstructed
/// stream and the initiation's trailing arguments.
pub type StreamHandler = Arc<dyn Fn(InboundStream, Vec<EventValue>) + Send + Sync>;

/// Bridge an application-level initiation event to inbound stream
/// construction.
///
/// The registered listener expects the event's first argument to be the
/// announced channel id (a JSON string) and forwards the remaining
/// arguments untouched as metadata. The inbound adapter attaches inside the
/// dispatch callback, before the announcing peer's `emit` returns, so
/// chunks written right after the announce cannot outrun the data listener.
///
/// Initiations without a usable channel id are dropped with a warning.
pub(crate) fn register(
    conn: Arc<dyn Connection>,
    event: &str,
    high_water_mark: usize,
    handler: StreamHandler,
) -> ListenerHandle {
    let handle = ListenerHandle::new(conn.clone());
    let listener: EventListenerFn = {
        let event_name = event.to_string();
        Arc::new(move |initiation| {
            let conn = conn.clone();
            let handler = handler.clone();
            let event_name = event_name.clone();
            async move {
                let mut args = initiation.args.into_iter();
                let channel_id = match args.next() {
                    Some(EventValue::Json(Value::String(id))) => ChannelId::from(id),
                    _ => {
                        warn!(event = %event_name, "initiation without channel id dropped");
                        return;
                    }
                };
                debug!(event = %event_name, channel = %channel_id, "stream initiated");
                let metadata: Vec<EventValue> = args.collect();
                let stream = InboundStream::attach(conn, channel_id, high_water_mark);
                handler(stream, metadata);
            }
            .boxed()
        })
    };
    handle.register(&[event.to_string()], listener);
    handle
}
