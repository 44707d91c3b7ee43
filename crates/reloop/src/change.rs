//! Single-slot change latch shared by the watcher and the proxy.
//!
//! The watcher raises it, the proxy takes it. Any number of raises before a
//! take collapse into one pending change, so a burst of file events costs at
//! most one rebuild.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Slot {
    raised: AtomicBool,
    notify: Notify,
}

/// Cloneable handle to one shared change slot.
#[derive(Debug, Clone, Default)]
pub struct ChangeSignal {
    slot: Arc<Slot>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a change as pending.
    ///
    /// Returns `true` only for the raise that moved the slot from unset to
    /// set; redundant raises return `false`.
    pub fn raise(&self) -> bool {
        let newly = !self.slot.raised.swap(true, Ordering::AcqRel);
        if newly {
            self.slot.notify.notify_waiters();
        }
        newly
    }

    /// Clear the slot and report whether a change was pending.
    pub fn take(&self) -> bool {
        self.slot.raised.swap(false, Ordering::AcqRel)
    }

    /// Non-consuming check used on the request fast path.
    pub fn is_raised(&self) -> bool {
        self.slot.raised.load(Ordering::Acquire)
    }

    /// Wait until a change is pending. Does not consume it.
    pub async fn raised(&self) {
        loop {
            let notified = self.slot.notify.notified();
            if self.is_raised() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_raises_collapse_into_one_take() {
        let signal = ChangeSignal::new();
        assert!(signal.raise());
        assert!(!signal.raise());
        assert!(!signal.raise());

        assert!(signal.take());
        assert!(!signal.take());
        assert!(!signal.is_raised());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let watcher_side = ChangeSignal::new();
        let proxy_side = watcher_side.clone();

        watcher_side.raise();
        assert!(proxy_side.is_raised());
        assert!(proxy_side.take());
        assert!(!watcher_side.is_raised());
    }

    #[tokio::test]
    async fn test_raised_wakes_waiter() {
        let signal = ChangeSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.raised().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.raise();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(signal.is_raised());
    }

    #[tokio::test]
    async fn test_raised_returns_immediately_when_pending() {
        let signal = ChangeSignal::new();
        signal.raise();
        tokio::time::timeout(Duration::from_millis(100), signal.raised())
            .await
            .expect("already raised");
    }
}
