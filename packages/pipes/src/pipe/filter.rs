// subsequence stages.

use super::{next, output, spawn_worker, Next};
use crate::{
    context::Context,
    error::{Error, Result},
    send::{deliver, Delivery},
};
use tokio::sync::mpsc::Receiver;


/// Forward only the elements of `input` for which `predicate` returns true
///
/// Rejected elements are dropped silently. Order is preserved. Stops without draining when `ctx`
/// fires.
pub fn filter<T, F>(ctx: &Context, mut input: Receiver<T>, mut predicate: F) -> Receiver<T>
where
    T: Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    let ctx = ctx.clone();
    let (send, recv) = output();
    spawn_worker("filter", async move {
        while let Next::Item(item) = next(&ctx, &mut input).await {
            if predicate(&item) && deliver(&ctx, &send, item).await != Delivery::Sent {
                break;
            }
        }
        trace!("worker finished");
    });
    recv
}

/// Unwrap a stream of [`Result`]s, handing errors to `on_error` instead of forwarding them
///
/// `on_error` runs synchronously, before the next element is received. An error never stops the
/// stream; only `input` closing or `ctx` firing does.
pub fn filter_error<T, F>(
    ctx: &Context,
    mut input: Receiver<Result<T>>,
    mut on_error: F,
) -> Receiver<T>
where
    T: Send + 'static,
    F: FnMut(Error) + Send + 'static,
{
    let ctx = ctx.clone();
    let (send, recv) = output();
    spawn_worker("filter_error", async move {
        while let Next::Item(result) = next(&ctx, &mut input).await {
            match result {
                Ok(value) => {
                    if deliver(&ctx, &send, value).await != Delivery::Sent {
                        break;
                    }
                }
                Err(e) => on_error(e),
            }
        }
        trace!("worker finished");
    });
    recv
}
