//! One-shot cancellation signal shared between a caller and running tools.

use std::sync::Arc;

use tokio::sync::watch;

/// A cancellation signal the caller fires at most once.
///
/// Clones share the same state; firing any clone cancels all of them. Tools
/// observe the signal only while their process is outstanding.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the signal. Subsequent calls are no-ops.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal has fired (immediately if it already has).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so `wait_for` cannot observe a close.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}
