use event_link::TransportError;

use crate::channel_id::ChannelId;

/// Errors raised by the stream adapters.
///
/// Receiver-side protocol oddities (a second end event, a chunk for a
/// channel that was never initiated or already ended) are not errors: the
/// connection drops events with no listener, and this layer keeps that
/// silent-drop policy.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Write or finish attempted after the stream already ended.
    #[error("stream channel {0} already ended")]
    StreamEnded(ChannelId),

    /// The connection failed to deliver an event. Never retried here.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reading from the source feeding an outbound stream failed.
    #[error("stream source read failed: {0}")]
    Source(#[from] std::io::Error),
}
