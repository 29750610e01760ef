/// Errors surfaced by the underlying connection's delivery path.
///
/// This layer never retries or translates delivery failures; they propagate
/// to the caller as-is.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The peer endpoint is gone.
    #[error("connection closed")]
    Closed,

    /// The connection accepted the event but could not deliver it.
    #[error("event delivery failed: {0}")]
    Delivery(String),
}
