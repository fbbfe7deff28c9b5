// stages that start a pipeline, and the bridge to futures streams.

use super::{output, spawn_worker};
use crate::{
    context::Context,
    send::{deliver, Delivery},
};
use tokio::sync::mpsc::Receiver;


/// Feed the items of `iter` into a new channel
///
/// The channel closes when the iterator is exhausted, `ctx` fires, or the receiver is dropped.
pub fn from_iter<I>(ctx: &Context, iter: I) -> Receiver<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    let ctx = ctx.clone();
    let iter = iter.into_iter();
    let (send, recv) = output();
    spawn_worker("from_iter", async move {
        for item in iter {
            if deliver(&ctx, &send, item).await != Delivery::Sent {
                break;
            }
        }
    });
    recv
}

/// Feed the items of `stream` into a new channel
///
/// The channel closes when the stream ends, `ctx` fires, or the receiver is dropped. Waiting on the
/// stream is raced against `ctx` like any other receive.
#[cfg(feature = "futures")]
pub fn from_stream<S>(ctx: &Context, stream: S) -> Receiver<S::Item>
where
    S: futures::Stream + Send + 'static,
    S::Item: Send + 'static,
{
    use futures::StreamExt;

    let ctx = ctx.clone();
    let (send, recv) = output();
    spawn_worker("from_stream", async move {
        let mut stream = std::pin::pin!(stream);
        loop {
            let item = tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                item = stream.next() => match item {
                    Some(item) => item,
                    None => break,
                },
            };
            if deliver(&ctx, &send, item).await != Delivery::Sent {
                break;
            }
        }
    });
    recv
}

/// Adapt a receiver into a [`Stream`](futures::Stream)
///
/// The stream ends when the channel closes.
#[cfg(feature = "futures")]
pub fn into_stream<T>(recv: Receiver<T>) -> impl futures::Stream<Item = T> {
    futures::stream::unfold(recv, |mut recv| async move {
        let item = recv.recv().await?;
        Some((item, recv))
    })
}
