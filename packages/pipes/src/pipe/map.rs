// one-to-one transforming stages.

use super::{next, output, spawn_worker, Next};
use crate::{
    context::Context,
    error::{Error, Result},
    send::{deliver, Delivery},
};
use std::{
    any::Any,
    ops::Deref,
    panic::{catch_unwind, AssertUnwindSafe},
};
use tokio::sync::mpsc::Receiver;


/// Transform each element of `input` with `f`, delivering a [`Result`] per element
///
/// Runs as a single worker, so output order follows input order. Errors returned by `f` become
/// [`Error::Failed`] elements. A panic inside `f` is caught and becomes an [`Error::Panicked`]
/// element; the stage keeps going. (Panics cannot be caught when built with `panic = "abort"`.)
///
/// When `ctx` fires, exactly one final [`Error::Cancelled`] element is emitted and the stage stops
/// without draining `input`. The output closes after that, or when `input` closes.
pub fn map<T, O, E, F>(ctx: &Context, mut input: Receiver<T>, mut f: F) -> Receiver<Result<O>>
where
    T: Send + 'static,
    O: Send + 'static,
    E: Into<anyhow::Error>,
    F: FnMut(T) -> Result<O, E> + Send + 'static,
{
    let ctx = ctx.clone();
    let (send, recv) = output();
    spawn_worker("map", async move {
        trace!("worker started");
        loop {
            let value = match next(&ctx, &mut input).await {
                Next::Item(value) => value,
                Next::Closed => break,
                Next::Cancelled(cause) => {
                    debug!(%cause, "map cancelled");
                    let _ = send.send(Err(cause.into())).await;
                    break;
                }
            };
            let mapped = match catch_unwind(AssertUnwindSafe(|| f(value))) {
                Ok(result) => result.map_err(Error::failed),
                Err(payload) => {
                    let msg = panic_message(payload.as_ref());
                    warn!(%msg, "caught panic in transformation");
                    Err(Error::Panicked(msg))
                }
            };
            match deliver(&ctx, &send, mapped).await {
                Delivery::Sent => (),
                Delivery::Cancelled(cause) => {
                    debug!(%cause, "map cancelled");
                    let _ = send.send(Err(cause.into())).await;
                    break;
                }
                Delivery::Closed => {
                    debug!("map output dropped");
                    break;
                }
            }
        }
        trace!("worker finished");
    });
    recv
}

/// Copy the pointee of each element of `input` into a fresh value
///
/// Elements may be any pointer type (`Arc<T>`, `Box<T>`, `&'static T`, ...). Delivered values are
/// clones, so they never alias the original referent. Stops without draining when `ctx` fires.
pub fn materialize<P, T>(ctx: &Context, mut input: Receiver<P>) -> Receiver<T>
where
    P: Deref<Target = T> + Send + 'static,
    T: Clone + Send + 'static,
{
    let ctx = ctx.clone();
    let (send, recv) = output();
    spawn_worker("materialize", async move {
        while let Next::Item(ptr) = next(&ctx, &mut input).await {
            let value = T::clone(&ptr);
            drop(ptr);
            if deliver(&ctx, &send, value).await != Delivery::Sent {
                break;
            }
        }
        trace!("worker finished");
    });
    recv
}

// best-effort rendering of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(&msg) = payload.downcast_ref::<&'static str>() {
        msg.to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
