//! Deadline / cancellation helper
//!
//! A small cancellation handle that can self-trigger after a duration,
//! for callers making their own time-bounded gateway calls. Deliberately
//! not wired into the cache or queue — those layers stay pass-through.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::trace;

/// Cancellation handle, cloneable across tasks
#[derive(Clone)]
pub struct DeadlineToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl DeadlineToken {
    /// A token that only triggers on explicit [`cancel`](Self::cancel)
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// A token that self-triggers once `duration` elapses
    ///
    /// Must be called from within a Tokio runtime.
    pub fn after(duration: Duration) -> Self {
        let token = Self::new();
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            trace!("Deadline elapsed, cancelling token");
            timer.cancel();
        });
        token
    }

    /// Trigger the token; idempotent
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for DeadlineToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Error returned by [`with_deadline`] when the future runs too long
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Deadline exceeded")]
pub struct DeadlineExceeded;

/// Run `fut` with an upper time bound
pub async fn with_deadline<F>(duration: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: std::future::Future,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| DeadlineExceeded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_manual_cancel() {
        let token = DeadlineToken::new();
        assert!(!token.is_cancelled());

        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        token.cancel();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_trigger_after_duration() {
        let token = DeadlineToken::after(Duration::from_millis(100));
        assert!(!token.is_cancelled());

        tokio::time::advance(Duration::from_millis(101)).await;
        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_completes_in_time() {
        let out = with_deadline(Duration::from_millis(100), async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out() {
        let out = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        })
        .await;
        assert_eq!(out, Err(DeadlineExceeded));
    }
}
