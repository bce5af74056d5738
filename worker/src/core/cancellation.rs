//! A single cooperative cancellation signal shared by every fan-out task.
//!
//! Grounded on `ShutdownService` in the teacher repo: a `watch::Sender<bool>`
//! pair cloned into every task, observed with `wait_for`, triggered once and
//! idempotently from anywhere.

use tokio::sync::watch;

/// A cheap, cloneable handle to a single cancellation flag.
///
/// Child [`crate::WorkerContext`]s inherit the same signal as their parent;
/// triggering it from any clone wakes every waiter.
#[derive(Clone)]
pub struct CancellationSignal {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// Create a new, untripped signal.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    /// Trip the signal. Idempotent; safe to call from any task.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// True if the signal has been tripped.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is tripped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|&v| v).await;
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_cancelled_initially() {
        let sig = CancellationSignal::new();
        assert!(!sig.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let sig = CancellationSignal::new();
        let waiter = sig.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        tokio::task::yield_now().await;
        sig.cancel();
        tokio::time::timeout(std::time::Duration::from_millis(200), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(sig.is_cancelled());
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let sig = CancellationSignal::new();
        let clone = sig.clone();
        clone.cancel();
        assert!(sig.is_cancelled());
    }
}
