// merging and splitting stages.

use super::{next, output, spawn_worker, Barrier, Next};
use crate::{
    context::Context,
    error::Result,
    ring::Ring,
    send::{deliver, Delivery},
};
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};


/// Merge several channels into one
///
/// One worker per input forwards into the shared output, so elements from different inputs
/// interleave arbitrarily. The output closes once every worker is done: each input has closed, or
/// `ctx` fired and the workers stopped without draining. With no inputs, the output is closed
/// immediately.
pub fn fan_in<T, I>(ctx: &Context, inputs: I) -> Receiver<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = Receiver<T>>,
{
    let (send, recv) = output();
    let mut barrier = Barrier::new("fan_in");
    for mut input in inputs {
        let ctx = ctx.clone();
        let send = send.clone();
        barrier.spawn(async move {
            while let Next::Item(item) = next(&ctx, &mut input).await {
                if deliver(&ctx, &send, item).await != Delivery::Sent {
                    break;
                }
            }
        });
    }
    barrier.close_after(send);
    recv
}

/// Duplicate `input` into two outputs which each replay the entire sequence in order
///
/// The whole input is buffered in memory before either output receives anything: first a worker
/// drains `input` until it closes or `ctx` fires, then two independent workers replay the buffer,
/// one per output. No backpressure reaches the producer of `input`. If `ctx` fires mid-drain, only
/// what was buffered so far is offered, and the replay workers stop at their first suspension
/// point anyway.
pub fn fan_out<T>(ctx: &Context, mut input: Receiver<T>) -> (Receiver<T>, Receiver<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let ctx = ctx.clone();
    let (send_1, recv_1) = output();
    let (send_2, recv_2) = output();
    spawn_worker("fan_out", async move {
        let mut buffered = Vec::new();
        while let Next::Item(item) = next(&ctx, &mut input).await {
            buffered.push(item);
        }
        drop(input);
        debug!(buffered = buffered.len(), "fan_out drained input, replaying");

        let buffered: Arc<[T]> = buffered.into();
        for send in [send_1, send_2] {
            let ctx = ctx.clone();
            let buffered = Arc::clone(&buffered);
            spawn_worker("fan_out", replay(ctx, buffered, send));
        }
    });
    (recv_1, recv_2)
}

async fn replay<T: Clone>(ctx: Context, buffered: Arc<[T]>, send: Sender<T>) {
    for item in buffered.iter() {
        if deliver(&ctx, &send, item.clone()).await != Delivery::Sent {
            break;
        }
    }
}

/// Distribute `input` over `count` new channels in strict rotation
///
/// Element `i` goes to output `i % count`. A single worker performs each send as a blocking send
/// to the selected output, so one slow consumer stalls distribution to all of them. All outputs
/// close when `input` closes, `ctx` fires, or any output receiver is dropped.
///
/// Fails with [`Error::EmptyRing`](crate::Error::EmptyRing) if `count` is zero.
pub fn round_robin_fan_out<T>(
    ctx: &Context,
    mut input: Receiver<T>,
    count: usize,
) -> Result<Vec<Receiver<T>>>
where
    T: Send + 'static,
{
    let (sends, recvs): (Vec<_>, Vec<_>) = (0..count).map(|_| output()).unzip();
    let mut ring = Ring::new(sends)?;

    let ctx = ctx.clone();
    spawn_worker("round_robin_fan_out", async move {
        while let Next::Item(item) = next(&ctx, &mut input).await {
            if deliver(&ctx, ring.next(), item).await != Delivery::Sent {
                break;
            }
        }
        trace!(outputs = ring.len(), "worker finished, closing outputs");
    });
    Ok(recvs)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        pipe::{collect::collect, source::from_iter},
    };
    use tokio::sync::mpsc::channel;

    fn numbered_sources(ctx: &Context, channels: u32, per_channel: u32) -> Vec<Receiver<u32>> {
        (0..channels)
            .map(|i| from_iter(ctx, (0..per_channel).map(move |j| j * ((i + 1) * 10))))
            .collect()
    }

    #[tokio::test]
    async fn fan_in_merges_everything() {
        let ctx = Context::new().with_timeout(std::time::Duration::from_secs(10));
        let combined = fan_in(&ctx, numbered_sources(&ctx, 3, 10));
        let mut got = collect(&ctx, combined, Vec::new()).await.unwrap();
        assert_eq!(got.len(), 30);

        let mut expected = (0..3u32)
            .flat_map(|i| (0..10u32).map(move |j| j * ((i + 1) * 10)))
            .collect::<Vec<_>>();
        got.sort();
        expected.sort();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn fan_in_of_nothing_closes() {
        let ctx = Context::new();
        let mut combined = fan_in::<u8, _>(&ctx, Vec::new());
        assert!(combined.recv().await.is_none());
    }

    #[tokio::test]
    async fn fan_in_closes_on_cancel() {
        let ctx = Context::new();
        let (_send_1, recv_1) = channel::<u8>(1);
        let (_send_2, recv_2) = channel::<u8>(1);
        let mut combined = fan_in(&ctx, [recv_1, recv_2]);
        ctx.cancel();
        assert!(combined.recv().await.is_none());
    }

    #[tokio::test]
    async fn fan_out_replays_identically() {
        let ctx = Context::new();
        let (out_1, out_2) = fan_out(&ctx, from_iter(&ctx, 0..10));
        let got_1 = collect(&ctx, out_1, Vec::new()).await.unwrap();
        let got_2 = collect(&ctx, out_2, Vec::new()).await.unwrap();
        assert_eq!(got_1.len(), 10);
        assert_eq!(got_1, got_2);
        assert_eq!(got_1, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn fan_out_outputs_are_independent() {
        let ctx = Context::new();
        let (out_1, out_2) = fan_out(&ctx, from_iter(&ctx, vec!["a".to_owned(), "b".to_owned()]));
        drop(out_1);
        let got = collect(&ctx, out_2, Vec::new()).await.unwrap();
        assert_eq!(got, ["a", "b"]);
    }

    #[tokio::test]
    async fn fan_out_on_cancel_closes_both() {
        let ctx = Context::new();
        let (send, recv) = channel(4);
        send.send(1).await.unwrap();
        let (mut out_1, mut out_2) = fan_out(&ctx, recv);
        ctx.cancel();
        assert!(out_1.recv().await.is_none());
        assert!(out_2.recv().await.is_none());
        drop(send);
    }

    #[tokio::test]
    async fn round_robin_splits_evenly_in_rotation() {
        let ctx = Context::new();
        let outputs = round_robin_fan_out(&ctx, from_iter(&ctx, 0..100), 4).unwrap();
        assert_eq!(outputs.len(), 4);

        // every output must be consumed concurrently, since the distribution blocks on each send
        let consumers = outputs
            .into_iter()
            .map(|out| {
                let ctx = ctx.clone();
                tokio::spawn(async move { collect(&ctx, out, Vec::new()).await.unwrap() })
            })
            .collect::<Vec<_>>();
        let mut total = 0;
        for (k, consumer) in consumers.into_iter().enumerate() {
            let got = consumer.await.unwrap();
            assert_eq!(got.len(), 25);
            assert!(got.iter().all(|&i| i % 4 == k));
            assert!(got.windows(2).all(|w| w[0] < w[1]));
            total += got.len();
        }
        assert_eq!(total, 100);
    }

    #[tokio::test]
    async fn round_robin_uneven_split_is_balanced() {
        let ctx = Context::new();
        let outputs = round_robin_fan_out(&ctx, from_iter(&ctx, 0..10), 3).unwrap();
        let consumers = outputs
            .into_iter()
            .map(|out| {
                let ctx = ctx.clone();
                tokio::spawn(async move { collect(&ctx, out, Vec::new()).await.unwrap().len() })
            })
            .collect::<Vec<_>>();
        let mut lens = Vec::new();
        for consumer in consumers {
            lens.push(consumer.await.unwrap());
        }
        assert_eq!(lens, [4, 3, 3]);
    }

    #[tokio::test]
    async fn round_robin_rejects_zero_outputs() {
        let ctx = Context::new();
        let (_send, recv) = channel::<u8>(1);
        let e = round_robin_fan_out(&ctx, recv, 0).unwrap_err();
        assert!(matches!(e, Error::EmptyRing(_)));
    }

    #[tokio::test]
    async fn round_robin_closes_all_on_cancel() {
        let ctx = Context::new();
        let (_send, recv) = channel::<u8>(1);
        let outputs = round_robin_fan_out(&ctx, recv, 3).unwrap();
        ctx.cancel();
        for mut out in outputs {
            assert!(out.recv().await.is_none());
        }
    }
}
