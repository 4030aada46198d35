//! Response body that reports when it has been sent in full.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::Stream;

type OnComplete = Box<dyn FnOnce() + Send>;

/// Wraps a body stream and runs `on_complete` once the inner stream ends.
///
/// A stream that errors or is dropped early (client hung up) never fires
/// the callback.
pub struct DeliveryStream<S> {
    inner: S,
    on_complete: Option<OnComplete>,
}

impl<S> DeliveryStream<S> {
    pub fn new(inner: S, on_complete: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner,
            on_complete: Some(Box::new(on_complete)),
        }
    }
}

impl<S> Stream for DeliveryStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = ready!(Pin::new(&mut self.inner).poll_next(cx));
        match &item {
            Some(Err(_)) => self.on_complete = None,
            None => {
                if let Some(on_complete) = self.on_complete.take() {
                    on_complete();
                }
            }
            Some(Ok(_)) => {}
        }
        Poll::Ready(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&fired);
        (fired, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn fires_once_after_the_last_chunk() {
        let (fired, on_complete) = counter();
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let mut stream = DeliveryStream::new(futures::stream::iter(chunks), on_complete);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_and_early_drops_do_not_fire() {
        let (fired, on_complete) = counter();
        let chunks = vec![Err(io::Error::other("disk read failed"))];
        let stream = DeliveryStream::new(futures::stream::iter(chunks), on_complete);
        let collected: Vec<_> = stream.collect().await;
        assert_eq!(collected.len(), 1);

        let (dropped, on_complete) = counter();
        let chunks = vec![Ok(Bytes::from_static(b"ab"))];
        let mut stream = DeliveryStream::new(futures::stream::iter(chunks), on_complete);
        assert!(stream.next().await.is_some());
        drop(stream);

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
    }
}
