//! One-shot completion signal.

use std::sync::Arc;
use tokio::sync::watch;

/// A signal that resolves once and stays resolved.
///
/// Clones observe the same signal. Resolving it again is a no-op.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Resolve the signal. Returns `true` only for the call that resolved it.
    pub fn complete(&self) -> bool {
        self.tx.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        })
    }

    pub fn is_complete(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal resolves. Returns immediately if it already has.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_once() {
        let signal = CompletionSignal::new();
        assert!(!signal.is_complete());
        assert!(signal.complete());
        assert!(!signal.complete());
        assert!(signal.clone().is_complete());
    }

    #[tokio::test]
    async fn test_waiters_wake() {
        let signal = CompletionSignal::new();
        let observer = signal.clone();
        let waiter = tokio::spawn(async move { observer.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.complete();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();

        // Late observers return straight away.
        signal.wait().await;
    }
}
