//! Cooperative cancellation
//!
//! A single token threads through the whole invocation tree; it is checked
//! at defined points only, never preemptively.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Cloneable cancellation flag shared by one run.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake any waiters.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            debug!("cancellation requested");
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            // Register with the Notify before the final flag check; an
            // unpolled Notified is not a waiter and notify_waiters stores
            // no permit, so enabling first closes the race with cancel().
            let notified = self.inner.notify.notified();
            let mut notified = std::pin::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Caller-side deadline: cancel this token after `timeout`.
    ///
    /// Timeouts are not part of the engine itself; this derives one from the
    /// token, which is all the core ever observes. Requires a tokio runtime.
    pub fn cancel_after(&self, timeout: Duration) {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            token.cancel();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_sets_flag() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        // Idempotent.
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            true
        });
        tokio::task::yield_now().await;
        token.cancel();
        assert!(handle.await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_from_another_thread_always_wakes() {
        // cancel() may land between the waiter's flag check and its await;
        // registration must happen before the final check so the wakeup is
        // never lost.
        for _ in 0..200 {
            let token = CancellationToken::new();
            let waiter = token.clone();
            let handle = tokio::spawn(async move {
                waiter.cancelled().await;
            });
            let cancel = token.clone();
            std::thread::spawn(move || cancel.cancel());
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("waiter missed the wakeup")
                .unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_deadline() {
        let token = CancellationToken::new();
        token.cancel_after(Duration::from_secs(5));
        tokio::task::yield_now().await;
        assert!(!token.is_cancelled());
        tokio::time::sleep(Duration::from_secs(6)).await;
        token.cancelled().await;
        assert!(token.is_cancelled());
    }
}
