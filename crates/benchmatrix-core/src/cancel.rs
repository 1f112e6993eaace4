//! Run cancellation.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared cancellation flag.
///
/// Clones observe the same flag. The host flips it (interrupt, global
/// deadline, fail-fast) and workers poll or await it.
#[derive(Debug, Clone)]
pub struct Cancellation {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { flag: Arc::new(tx) }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once [`Cancellation::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
