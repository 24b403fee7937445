//! Shutdown signal shared by every actor.

use tokio::sync::watch;

/// Creates a linked trigger/signal pair.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

/// Fires the shutdown. Held by the teardown path.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Signals every [`ShutdownSignal`]. Safe to call more than once.
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }

    /// Hands out another signal linked to this trigger.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal { rx: self.tx.subscribe() }
    }
}

/// Observed by actors inside their `tokio::select!` loops.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown has been fired, or once the trigger is
    /// dropped. Returns immediately if either already happened.
    pub async fn wait(&mut self) {
        // `wait_for` errors only when the trigger is gone, which is also
        // a reason to stop.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }

    /// Non-blocking check.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_wait_resolves_after_fire() {
        let (trigger, mut signal) = shutdown_channel();
        assert!(!signal.is_fired());

        trigger.fire();
        trigger.fire();

        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .expect("signal should resolve");
        assert!(signal.is_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_pends_until_fired() {
        let (trigger, signal) = shutdown_channel();
        let mut late = trigger.subscribe();

        let pending = tokio::time::timeout(Duration::from_secs(1), late.wait()).await;
        assert!(pending.is_err(), "must not resolve before fire");

        trigger.fire();
        let mut s = signal.clone();
        s.wait().await;
        late.wait().await;
    }

    #[tokio::test]
    async fn test_wait_resolves_when_trigger_dropped() {
        let (trigger, mut signal) = shutdown_channel();
        drop(trigger);
        signal.wait().await;
    }
}
