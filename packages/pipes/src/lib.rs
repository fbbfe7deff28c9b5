//! Cancellation-aware combinators for building pipelines out of tokio channels
//!
//! Each combinator takes the receiving half of a channel, spawns one or more worker tasks, and
//! returns the receiving half of a new channel. Chaining combinators builds a processing graph:
//!
//! ```no_run
//! # async fn demo() -> pipes::Result<()> {
//! use pipes::{Context, collect, filter, from_iter, map, filter_error};
//!
//! let ctx = Context::new();
//! let numbers = from_iter(&ctx, 0..100u32);
//! let big = filter(&ctx, numbers, |&n| n >= 50);
//! let parsed = map(&ctx, big, |n| n.to_string().parse::<u64>());
//! let ok = filter_error(&ctx, parsed, |e| eprintln!("skipping: {}", e));
//! let all = collect(&ctx, ok, Vec::new()).await?;
//! assert_eq!(all.len(), 50);
//! # Ok(())
//! # }
//! ```
//!
//! Every blocking receive, send, and tick wait inside a worker is raced against a [`Context`], and
//! cancellation wins ties. Cancellation is cooperative: workers notice it at their next await,
//! stop without draining their input, and close their outputs. Stages with several writers into
//! one output close it only after all of them are done.
//!
//! Channels created by combinators are bounded to [`OUTPUT_BOUND`]. All combinators spawn onto the
//! ambient tokio runtime and must be called from within one.

#[macro_use]
extern crate tracing;

mod context;
mod error;
mod pipe;
mod ring;
mod send;
mod throttle;
mod util;

pub use crate::{
    context::Context,
    error::{CancelCause, CollectError, EmptyRingError, Error, Result},
    pipe::{
        OUTPUT_BOUND,
        collect::{collect, pour},
        fan::{fan_in, fan_out, round_robin_fan_out},
        filter::{filter, filter_error},
        map::{map, materialize},
        par_map::par_map,
        source::from_iter,
    },
    ring::Ring,
    send::{send_or_done, send_or_timeout},
    throttle::throttle,
};

#[cfg(feature = "futures")]
pub use crate::pipe::source::{from_stream, into_stream};
