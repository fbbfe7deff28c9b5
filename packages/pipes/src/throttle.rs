// fixed-interval rate limiting.

use crate::{
    context::Context,
    pipe::{next, output, spawn_worker, Next},
    send::{deliver, Delivery},
};
use std::time::Duration;
use tokio::{
    sync::mpsc::Receiver,
    time::{interval_at, Instant, MissedTickBehavior},
};


/// Forward elements of `input` at most once per `interval`
///
/// A tick fires every `interval`, the first one `interval` after this call. On each tick one
/// element is received (waiting for it if necessary) and forwarded; further ready elements wait
/// for the next tick. The schedule restarts after every delivery, so consecutive deliveries are
/// never closer than `interval` even after the stage waited on slow input. Nothing is dropped,
/// throughput is just capped.
///
/// The output closes when `input` closes. `ctx` firing stops the stage immediately, whatever the
/// tick phase. A zero `interval` disables throttling and elements are forwarded as they arrive.
pub fn throttle<T>(ctx: &Context, mut input: Receiver<T>, interval: Duration) -> Receiver<T>
where
    T: Send + 'static,
{
    let ctx = ctx.clone();
    let (send, recv) = output();
    spawn_worker("throttle", async move {
        let mut ticks = (!interval.is_zero()).then(|| {
            let mut ticks = interval_at(Instant::now() + interval, interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticks
        });
        loop {
            if let Some(ref mut ticks) = ticks {
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => break,
                    _ = ticks.tick() => (),
                }
            }
            let item = match next(&ctx, &mut input).await {
                Next::Item(item) => item,
                Next::Closed => break,
                Next::Cancelled(cause) => {
                    debug!(%cause, "throttle cancelled");
                    break;
                }
            };
            if deliver(&ctx, &send, item).await != Delivery::Sent {
                break;
            }
            if let Some(ref mut ticks) = ticks {
                ticks.reset();
            }
        }
        trace!("worker finished");
    });
    recv
}
