// terminal stages.

use super::{next, Next};
use crate::{
    context::Context,
    error::{CollectError, Error, Result},
};
use tokio::sync::mpsc::Receiver;


/// Drain `input` into a vector seeded with `initial`, in arrival order
///
/// Resolves when `input` closes. If `ctx` fires first, resolves to a [`CollectError`] holding the
/// elements collected so far (possibly only `initial`) and the cause.
pub async fn collect<T>(
    ctx: &Context,
    mut input: Receiver<T>,
    initial: Vec<T>,
) -> Result<Vec<T>, CollectError<T>> {
    let mut collected = initial;
    loop {
        match next(ctx, &mut input).await {
            Next::Item(item) => collected.push(item),
            Next::Closed => return Ok(collected),
            Next::Cancelled(cause) => {
                debug!(collected = collected.len(), %cause, "collect cancelled");
                return Err(CollectError { collected, cause });
            }
        }
    }
}

/// [`collect`] `input`, then hand the collected vector to `sink`
///
/// Fails with [`Error::Cancelled`] without invoking `sink` if `ctx` fires first, or with
/// [`Error::Failed`] if `sink` returns an error.
pub async fn pour<T, F, E>(
    ctx: &Context,
    input: Receiver<T>,
    sink: F,
    initial: Vec<T>,
) -> Result<()>
where
    F: FnOnce(Vec<T>) -> Result<(), E>,
    E: Into<anyhow::Error>,
{
    let collected = collect(ctx, input, initial).await?;
    sink(collected).map_err(Error::failed)
}
