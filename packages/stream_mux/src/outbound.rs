use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use event_link::{Connection, EventValue};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::channel_id::ChannelId;
use crate::error::StreamError;

/// Chunk size when piping from an `AsyncRead` source.
const PIPE_CHUNK_BYTES: usize = 64 * 1024;

/// Write side of one multiplexed stream channel.
///
/// Each [`write`](Self::write) emits one `stream:<id>:data` event on the
/// shared connection; [`finish`](Self::finish) emits the single
/// `stream:<id>:end` event and seals the stream. The caller announces
/// [`channel_id`](Self::channel_id) to the receiving peer through an
/// application-level event of its choosing.
pub struct OutboundStream {
    channel_id: ChannelId,
    conn: Arc<dyn Connection>,
    ended: bool,
}

impl OutboundStream {
    pub(crate) fn new(conn: Arc<dyn Connection>) -> Self {
        let channel_id = ChannelId::generate();
        debug!(channel = %channel_id, "outbound stream channel opened");
        Self {
            channel_id,
            conn,
            ended: false,
        }
    }

    /// The id the receiving peer needs to reconstruct this stream.
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Emit one chunk. Fails with [`StreamError::StreamEnded`] after
    /// `finish`, without emitting anything.
    pub async fn write(&mut self, chunk: Bytes) -> Result<(), StreamError> {
        if self.ended {
            return Err(StreamError::StreamEnded(self.channel_id.clone()));
        }
        self.conn
            .emit(&self.channel_id.data_event(), vec![EventValue::Binary(chunk)])
            .await?;
        Ok(())
    }

    /// Emit the end event and seal the stream. At most one `finish`
    /// succeeds; later calls fail like a post-end `write`.
    pub async fn finish(&mut self) -> Result<(), StreamError> {
        if self.ended {
            return Err(StreamError::StreamEnded(self.channel_id.clone()));
        }
        self.ended = true;
        self.conn.emit(&self.channel_id.end_event(), Vec::new()).await?;
        debug!(channel = %self.channel_id, "outbound stream channel ended");
        Ok(())
    }

    /// Pipe `reader` to exhaustion, one chunk per read. Returns the number
    /// of bytes written. Does not call `finish`; the caller decides when
    /// the stream is complete.
    pub async fn write_all_from<R>(&mut self, reader: &mut R) -> Result<u64, StreamError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut total = 0u64;
        let mut buf = BytesMut::with_capacity(PIPE_CHUNK_BYTES);
        loop {
            let n = reader.read_buf(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            self.write(buf.split().freeze()).await?;
            buf.reserve(PIPE_CHUNK_BYTES);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_link::LocalConnection;

    #[tokio::test]
    async fn write_after_finish_is_rejected() {
        let conn = LocalConnection::loopback();
        let mut stream = OutboundStream::new(conn);
        stream.finish().await.unwrap();

        let err = stream.write(Bytes::from_static(b"late")).await.unwrap_err();
        assert!(matches!(err, StreamError::StreamEnded(_)));
    }

    #[tokio::test]
    async fn second_finish_is_rejected() {
        let conn = LocalConnection::loopback();
        let mut stream = OutboundStream::new(conn);
        stream.finish().await.unwrap();
        let err = stream.finish().await.unwrap_err();
        assert!(matches!(err, StreamError::StreamEnded(_)));
    }

    #[tokio::test]
    async fn write_all_from_chunks_the_source() {
        let conn = LocalConnection::loopback();
        let mut stream = OutboundStream::new(conn);
        let mut source: &[u8] = b"some source bytes";
        let written = stream.write_all_from(&mut source).await.unwrap();
        assert_eq!(written, 17);
    }
}
