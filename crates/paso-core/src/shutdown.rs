use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// Broadcast-based shutdown coordinator shared by the daemon and the TUI.
///
/// Components register interest in shutdown by calling `subscribe()`, then
/// `select!` on the returned receiver alongside their main work loop.
///
/// ```ignore
/// let shutdown = ShutdownSignal::new();
/// let mut rx = shutdown.subscribe();
///
/// tokio::select! {
///     _ = rx.recv() => { /* graceful cleanup */ }
///     _ = do_work() => {}
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    trigger: broadcast::Sender<()>,
    shutting_down: Arc<AtomicBool>,
    drain_tx: Arc<watch::Sender<usize>>,
    drain_rx: watch::Receiver<usize>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (trigger, _) = broadcast::channel(1);
        let (drain_tx, drain_rx) = watch::channel(0);
        Self {
            trigger,
            shutting_down: Arc::new(AtomicBool::new(false)),
            drain_tx: Arc::new(drain_tx),
            drain_rx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.trigger.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    /// Trigger shutdown for all subscribers. Idempotent: a second call is a
    /// no-op logged at warn level, never a second broadcast.
    pub fn trigger(&self) {
        if self
            .shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            info!("shutdown signal triggered");
            let _ = self.trigger.send(());
        } else {
            warn!("shutdown already triggered");
        }
    }

    pub fn confirm_drained(&self) {
        self.drain_tx.send_modify(|count| *count += 1);
    }

    pub async fn wait_for_drain(&mut self, expected: usize, timeout: Duration) -> DrainResult {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let current = *self.drain_rx.borrow();
            if current >= expected {
                info!(count = current, "all components drained");
                return DrainResult::Complete(current);
            }

            match tokio::time::timeout_at(deadline, self.drain_rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => {
                    let current = *self.drain_rx.borrow();
                    return DrainResult::Complete(current);
                }
                Err(_) => {
                    let current = *self.drain_rx.borrow();
                    warn!(current, expected, "drain timeout — some components did not confirm");
                    return DrainResult::Timeout { confirmed: current, expected };
                }
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.trigger.receiver_count()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainResult {
    Complete(usize),
    Timeout { confirmed: usize, expected: usize },
}

impl DrainResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, DrainResult::Complete(_))
    }
}

/// RAII guard that calls `confirm_drained()` when dropped. Give one to each
/// task that needs to participate in graceful shutdown.
pub struct ShutdownGuard {
    signal: ShutdownSignal,
}

impl ShutdownGuard {
    pub fn new(signal: ShutdownSignal) -> Self {
        Self { signal }
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.signal.confirm_drained();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_signal_is_not_shutting_down() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutting_down());
    }

    #[test]
    fn trigger_sets_flag() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        assert!(signal.is_shutting_down());
    }

    #[test]
    fn double_trigger_is_idempotent() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        assert!(signal.is_shutting_down());
    }

    #[test]
    fn subscriber_count() {
        let signal = ShutdownSignal::new();
        assert_eq!(signal.subscriber_count(), 0);
        let rx1 = signal.subscribe();
        assert_eq!(signal.subscriber_count(), 1);
        let _rx2 = signal.subscribe();
        assert_eq!(signal.subscriber_count(), 2);
        drop(rx1);
        assert_eq!(signal.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn subscribe_receives_trigger() {
        let signal = ShutdownSignal::new();
        let mut rx = signal.subscribe();
        signal.trigger();
        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn drain_completes_when_all_confirm() {
        let mut signal = ShutdownSignal::new();
        let guard1 = ShutdownGuard::new(signal.clone());
        let guard2 = ShutdownGuard::new(signal.clone());
        signal.trigger();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(guard1);
        });
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard2);
        });

        let result = signal.wait_for_drain(2, Duration::from_secs(1)).await;
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn drain_timeout_when_not_all_confirm() {
        let mut signal = ShutdownSignal::new();
        let _guard = ShutdownGuard::new(signal.clone());
        signal.trigger();

        let result = signal.wait_for_drain(2, Duration::from_millis(50)).await;
        match result {
            DrainResult::Timeout { confirmed, expected } => {
                assert_eq!(confirmed, 0);
                assert_eq!(expected, 2);
            }
            _ => panic!("expected timeout"),
        }
    }

    #[test]
    fn clone_shares_state() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        signal.trigger();
        assert!(clone.is_shutting_down());
    }

    #[tokio::test]
    async fn guard_confirms_on_drop() {
        let mut signal = ShutdownSignal::new();
        {
            let _guard = ShutdownGuard::new(signal.clone());
        }
        let result = signal.wait_for_drain(1, Duration::from_millis(100)).await;
        assert!(result.is_complete());
    }

    #[test]
    fn default_creates_new_signal() {
        let signal = ShutdownSignal::default();
        assert!(!signal.is_shutting_down());
    }
}
