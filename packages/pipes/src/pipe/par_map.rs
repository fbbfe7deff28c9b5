// parallel per-channel processing.

use super::{next, output, Barrier, Next};
use crate::{
    context::Context,
    error::Error,
    send::{deliver, Delivery},
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};


/// Process several channels in parallel with one shared function, merging successes
///
/// Spawns one worker per input. Each worker applies `process` to its elements in order and
/// forwards successes to the shared output. When `process` fails, the worker posts the error to
/// the error channel and stops reading its own input; the other workers carry on. When `ctx`
/// fires, every worker posts [`Error::Cancelled`] and stops.
///
/// The error channel has room for one error per worker and each worker posts at most one, so
/// posting never blocks. Both channels close once every worker has finished.
pub fn par_map<T, O, E, F, I>(
    ctx: &Context,
    process: F,
    inputs: I,
) -> (Receiver<O>, Receiver<Error>)
where
    T: Send + 'static,
    O: Send + 'static,
    E: Into<anyhow::Error> + 'static,
    F: Fn(T) -> Result<O, E> + Send + Sync + 'static,
    I: IntoIterator<Item = Receiver<T>>,
{
    let inputs = inputs.into_iter().collect::<Vec<_>>();
    let process = Arc::new(move |value: T| process(value).map_err(Error::failed));
    let (send, recv) = output();
    let (send_err, recv_err) = mpsc::channel(inputs.len().max(1));

    let mut barrier = Barrier::new("par_map");
    for (idx, input) in inputs.into_iter().enumerate() {
        barrier.spawn(worker(
            idx,
            ctx.clone(),
            Arc::clone(&process),
            input,
            send.clone(),
            send_err.clone(),
        ));
    }
    barrier.close_after((send, send_err));
    (recv, recv_err)
}

async fn worker<T, O, F>(
    idx: usize,
    ctx: Context,
    process: Arc<F>,
    mut input: Receiver<T>,
    send: Sender<O>,
    send_err: Sender<Error>,
)
where
    F: Fn(T) -> Result<O, Error>,
{
    loop {
        let value = match next(&ctx, &mut input).await {
            Next::Item(value) => value,
            Next::Closed => break,
            Next::Cancelled(cause) => {
                debug!(idx, %cause, "par_map worker cancelled");
                let _ = send_err.send(cause.into()).await;
                break;
            }
        };
        let processed = match (*process)(value) {
            Ok(processed) => processed,
            Err(e) => {
                debug!(idx, %e, "par_map worker failed, abandoning its input");
                let _ = send_err.send(e).await;
                break;
            }
        };
        match deliver(&ctx, &send, processed).await {
            Delivery::Sent => (),
            Delivery::Cancelled(cause) => {
                debug!(idx, %cause, "par_map worker cancelled");
                let _ = send_err.send(cause.into()).await;
                break;
            }
            Delivery::Closed => break,
        }
    }
    trace!(idx, "worker finished");
}
