//! Debounced directory sync timer.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

struct PendingSync {
    immediate: bool,
    task: JoinHandle<()>,
}

/// A single cancel-and-restart timer.
///
/// Each [`schedule`](DeferredSync::schedule) replaces the pending timer, so
/// a burst of requests produces one flush after the burst settles. The one
/// exception: a pending immediate flush is never pushed back by a delayed
/// request.
///
/// When the timer fires, the flush is spawned as its own task. Cancelling or
/// rescheduling afterwards cannot interrupt a flush already under way.
#[derive(Default)]
pub(crate) struct DeferredSync {
    pending: Option<PendingSync>,
}

impl DeferredSync {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `flush` after `delay`, replacing any pending timer.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn schedule<F, Fut>(&mut self, delay: Duration, immediate: bool, flush: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Some(pending) = &self.pending {
            if !pending.task.is_finished() {
                if pending.immediate && !immediate {
                    return;
                }
                pending.task.abort();
            }
        }

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(flush());
        });
        self.pending = Some(PendingSync { immediate, task });
    }

    /// Drop the pending timer, if any, without flushing.
    pub(crate) fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }

    /// Whether a timer is waiting to fire.
    pub(crate) fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.task.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn flush_counter() -> (Arc<AtomicUsize>, impl Fn() -> std::future::Ready<()> + Clone) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_into_one_flush() {
        let (count, flush) = flush_counter();
        let mut timer = DeferredSync::new();

        for _ in 0..5 {
            timer.schedule(Duration::from_secs(2), false, flush.clone());
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_replaces_delayed() {
        let (count, flush) = flush_counter();
        let mut timer = DeferredSync::new();

        timer.schedule(Duration::from_secs(2), false, flush.clone());
        timer.schedule(Duration::ZERO, true, flush.clone());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_does_not_postpone_immediate() {
        let (count, flush) = flush_counter();
        let mut timer = DeferredSync::new();

        timer.schedule(Duration::from_millis(10), true, flush.clone());
        timer.schedule(Duration::from_secs(2), false, flush.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_flush() {
        let (count, flush) = flush_counter();
        let mut timer = DeferredSync::new();

        timer.schedule(Duration::from_secs(2), false, flush);
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
