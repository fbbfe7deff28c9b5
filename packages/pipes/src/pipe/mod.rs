// the combinator set.
//
// every combinator follows the same shape:
//
//   caller-owned Receiver<T> ---> [ worker task(s) ] ---> Sender<O> / Receiver<O> returned to caller
//                                        ^
//                                        |
//                                 Context::cancelled()
//
// - the combinator function itself never blocks. it creates the output channel, spawns its
//   workers onto the ambient tokio runtime, and returns the output receiver.
// - every suspension point in a worker is a biased select between the operation and the context
//   firing, so cancellation is observed at the next await and always wins ties.
// - closing a channel means dropping its last sender. each output channel is owned by exactly one
//   stage. where several workers write into one output (fan_in, par_map) a closer task holds the
//   original sender and joins every worker before dropping it, so the channel closes only after
//   all writers are done.
// - a worker whose output receiver was dropped stops, since nothing can observe its work anymore.
//
// modules:
//
//   collect -- collect, pour           (sinks)
//   map     -- map, materialize        (one-to-one transforms)
//   filter  -- filter, filter_error    (subsequences)
//   fan     -- fan_in, fan_out, round_robin_fan_out
//   par_map -- par_map
//   source  -- from_iter, from_stream, into_stream

pub(crate) mod collect;
pub(crate) mod map;
pub(crate) mod filter;
pub(crate) mod fan;
pub(crate) mod par_map;
pub(crate) mod source;

use crate::{
    context::Context,
    error::CancelCause,
};
use std::future::Future;
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::{JoinHandle, JoinSet},
};
use tracing::Instrument;


/// Bound of every channel a combinator creates for its output
///
/// One slot is the closest a tokio channel gets to a rendezvous: a stage runs at most one element
/// ahead of its consumer.
pub const OUTPUT_BOUND: usize = 1;

// create an output channel for a stage.
pub(crate) fn output<T>() -> (Sender<T>, Receiver<T>) {
    mpsc::channel(OUTPUT_BOUND)
}

// spawn a worker task for the named stage onto the ambient runtime.
pub(crate) fn spawn_worker<F>(stage: &'static str, worker: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(worker.instrument(trace_span!("pipe", stage)))
}


// outcome of a cancellation-raced receive.
pub(crate) enum Next<T> {
    Item(T),
    // all senders are gone and nothing is buffered
    Closed,
    Cancelled(CancelCause),
}

// receive the next element from `src` unless `ctx` fires first. cancellation takes precedence.
pub(crate) async fn next<T>(ctx: &Context, src: &mut Receiver<T>) -> Next<T> {
    tokio::select! {
        biased;
        cause = ctx.cancelled() => Next::Cancelled(cause),
        item = src.recv() => match item {
            Some(item) => Next::Item(item),
            None => Next::Closed,
        },
    }
}


// completion barrier over a fixed set of workers writing into shared outputs.
//
// workers are spawned into the barrier, then `close_after` hands the barrier and the outputs'
// original senders to a closer task which joins every worker before dropping the senders.
pub(crate) struct Barrier {
    stage: &'static str,
    workers: JoinSet<()>,
}

impl Barrier {
    pub(crate) fn new(stage: &'static str) -> Self {
        Barrier { stage, workers: JoinSet::new() }
    }

    pub(crate) fn spawn<F>(&mut self, worker: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.workers.spawn(worker.instrument(trace_span!("pipe", stage = self.stage)));
    }

    // spawn the closer task. `outputs` is dropped once every worker has finished.
    pub(crate) fn close_after<D>(self, outputs: D)
    where
        D: Send + 'static,
    {
        let Barrier { stage, mut workers } = self;
        spawn_worker(stage, async move {
            trace!(workers = workers.len(), "waiting on completion barrier");
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(%e, "pipe worker panicked");
                    }
                }
            }
            trace!("completion barrier passed, closing output");
            drop(outputs);
        });
    }
}
