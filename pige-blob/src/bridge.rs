//! Push → pull adapter.
//!
//! Store drivers hand out bytes by pushing them (a cursor loop, a callback,
//! an event source). HTTP bodies pull. [`push_stream`] runs the pushing side
//! as its own task and exposes it as a demand-driven [`ByteStream`]:
//!
//! - at most one chunk waits in the channel; the producer is suspended in
//!   [`ChunkSender::send`] until the consumer takes it
//! - a producer error becomes the stream's last item
//! - a producer that panics or is cancelled ends the stream with an error,
//!   never with a clean (truncated) end
//! - dropping the stream aborts the producer task, releasing whatever it holds

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Item = Result<Bytes, io::Error>;

/// Pushing half handed to the producer.
pub struct ChunkSender {
    tx: mpsc::Sender<Item>,
}

impl ChunkSender {
    /// Push one chunk, waiting until the consumer has room for it.
    ///
    /// Fails with `BrokenPipe` once the consumer is gone; producers should
    /// stop at that point (the `?` operator does).
    pub async fn send(&self, chunk: Bytes) -> io::Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "byte stream consumer dropped"))
    }
}

/// Pulling half: a `Stream` of chunks fed by a producer task.
pub struct PushStream {
    rx: mpsc::Receiver<Item>,
    task: Option<JoinHandle<()>>,
}

/// Spawn `producer` and return the stream it feeds.
///
/// Must be called from within a tokio runtime.
pub fn push_stream<F, Fut>(producer: F) -> PushStream
where
    F: FnOnce(ChunkSender) -> Fut,
    Fut: Future<Output = io::Result<()>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let fut = producer(ChunkSender { tx: tx.clone() });

    let task = tokio::spawn(async move {
        if let Err(err) = fut.await {
            if err.kind() != io::ErrorKind::BrokenPipe {
                tracing::debug!(error = %err, "byte source failed mid-stream");
            }
            let _ = tx.send(Err(err)).await;
        }
    });

    PushStream {
        rx,
        task: Some(task),
    }
}

impl Stream for PushStream {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if let Some(item) = ready!(this.rx.poll_recv(cx)) {
            return Poll::Ready(Some(item));
        }

        // Channel closed: only a producer that returned normally means "done".
        let Some(handle) = this.task.as_mut() else {
            return Poll::Ready(None);
        };
        let joined = ready!(Pin::new(handle).poll(cx));
        this.task = None;
        match joined {
            Ok(()) => Poll::Ready(None),
            Err(e) => Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::Other,
                format!("byte source aborted: {e}"),
            )))),
        }
    }
}

impl Drop for PushStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
