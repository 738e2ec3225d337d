//! Piping provider download streams into response bodies.

use axum::body::Body;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, error, info};

use driverelay_common::Result;
use driverelay_storage::ByteStream;

/// Wraps a provider stream to log how the transfer ended.
///
/// Chunks are passed through one at a time as the response body polls for
/// them, so the provider is only read as fast as the client consumes. The
/// first read error ends the stream.
pub struct LoggedStream {
    inner: ByteStream,
    file_id: String,
    bytes: u64,
    finished: bool,
}

impl LoggedStream {
    /// Wrap `inner`, labelling log events with `file_id`.
    pub fn new(inner: ByteStream, file_id: impl Into<String>) -> Self {
        Self {
            inner,
            file_id: file_id.into(),
            bytes: 0,
            finished: false,
        }
    }
}

impl Stream for LoggedStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.bytes += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                error!(file_id = %self.file_id, error = %e, "Error downloading file");
                self.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                info!(file_id = %self.file_id, bytes = self.bytes, "Download complete");
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for LoggedStream {
    fn drop(&mut self) {
        if !self.finished {
            debug!(file_id = %self.file_id, bytes = self.bytes, "Download aborted by client");
        }
    }
}

/// Response body streaming `stream` to the client.
pub fn stream_body(stream: ByteStream, file_id: &str) -> Body {
    Body::from_stream(LoggedStream::new(stream, file_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use driverelay_common::Error;
    use futures::{stream, StreamExt};

    #[tokio::test]
    async fn test_passes_chunks_through() {
        let inner: ByteStream = Box::pin(stream::iter(vec![
            Ok::<_, Error>(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]));
        let mut logged = LoggedStream::new(inner, "1");

        let mut collected = Vec::new();
        while let Some(chunk) = logged.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(collected, b"abcd");
        assert_eq!(logged.bytes, 4);
        assert!(logged.finished);
    }

    #[tokio::test]
    async fn test_stops_after_first_error() {
        let inner: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(Error::Network("connection reset".to_string())),
            Ok(Bytes::from_static(b"never")),
        ]));
        let items: Vec<Result<Bytes>> = LoggedStream::new(inner, "1").collect().await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }
}
