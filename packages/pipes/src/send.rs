// bounded-wait, single-attempt sends.

use crate::{
    context::Context,
    error::CancelCause,
};
use std::time::Duration;
use tokio::sync::mpsc::Sender;


/// Try once to send `value` into `dst`, giving up if `ctx` fires first
///
/// At most once and best-effort: if the context fires before the channel accepts the value (or
/// the channel is closed) the value is silently dropped. Nothing is reported, nothing is retried.
pub async fn send_or_done<T>(ctx: &Context, value: T, dst: &Sender<T>) {
    let _ = deliver(ctx, dst, value).await;
}

/// Try once to send `value` into `dst`, giving up after `duration`
///
/// Same contract as [`send_or_done`], bounded by a timer instead of a context. A value that was
/// not accepted within `duration` is dropped and will never arrive later.
pub async fn send_or_timeout<T>(value: T, dst: &Sender<T>, duration: Duration) {
    let _ = tokio::time::timeout(duration, dst.send(value)).await;
}


// outcome of a cancellation-raced send.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Delivery {
    // the channel accepted the value
    Sent,
    // the context fired first. the value was dropped.
    Cancelled(CancelCause),
    // all receivers are gone. the value was dropped.
    Closed,
}

// send `value` into `dst` unless `ctx` fires first. cancellation takes precedence.
pub(crate) async fn deliver<T>(ctx: &Context, dst: &Sender<T>, value: T) -> Delivery {
    tokio::select! {
        biased;
        cause = ctx.cancelled() => Delivery::Cancelled(cause),
        result = dst.send(value) => match result {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Closed,
        },
    }
}
