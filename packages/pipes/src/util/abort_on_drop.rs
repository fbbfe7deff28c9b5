//! Tokio utility.

use std::future::Future;
use tokio::task::{
    spawn,
    AbortHandle,
};


/// Wrapper around a background tokio task that aborts it if dropped
///
/// Used for timers that only matter while something still refers to them, such as the deadline
/// of a [`Context`](crate::Context).
#[derive(Debug)]
pub(crate) struct AbortOnDrop(AbortHandle);

impl AbortOnDrop {
    /// Spawn a tokio task and wrap with self.
    pub(crate) fn spawn<F>(f: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        AbortOnDrop(spawn(f).abort_handle())
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering::Relaxed},
        },
        time::Duration,
    };

    #[tokio::test(start_paused = true)]
    async fn dropping_aborts_the_task() {
        let fired = Arc::new(AtomicBool::new(false));
        let task = AbortOnDrop::spawn({
            let fired = Arc::clone(&fired);
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                fired.store(true, Relaxed);
            }
        });
        drop(task);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!fired.load(Relaxed));
    }
}
