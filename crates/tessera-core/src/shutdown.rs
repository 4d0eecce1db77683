//! Cooperative shutdown signalling.
//!
//! Every retry loop and scheduler loop observes a `ShutdownSignal` at each
//! suspension point. Triggering the signal does not cancel in-flight futures;
//! it makes the next cooperative check abort with `EngineError::Cancelled`.

use tokio::sync::watch;

/// Cloneable shutdown flag backed by a watch channel.
///
/// All clones observe the same flag. Once triggered, the flag never resets.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Create a signal in the not-triggered state.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        // Receivers are clones of `self.rx`, so send cannot fail while any
        // signal handle is alive.
        let _ = self.tx.send(true);
    }

    /// Non-blocking check.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_untriggered() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());
    }

    #[tokio::test]
    async fn trigger_is_visible_to_all_clones() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        signal.trigger();
        assert!(clone.is_triggered());
    }

    #[tokio::test]
    async fn triggered_future_resolves_after_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.triggered().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
