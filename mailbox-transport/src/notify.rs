//! Interrupt-style wakeups between endpoints.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Level-triggered wakeup for one consumer.
///
/// Raising while nobody waits stores a single pending wakeup; further raises
/// coalesce into it. A consumer must therefore drain everything visible in
/// the registers on each wakeup instead of counting signals.
#[derive(Debug, Default)]
pub struct Notification {
    notify: Notify,
    raised: AtomicU64,
    wakeups: AtomicU64,
}

impl Notification {
    /// Create a notification with no pending wakeup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the consumer.
    pub fn raise(&self) {
        self.raised.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
    }

    /// Wait until the notification is raised.
    ///
    /// Returns immediately if a wakeup is already pending.
    pub async fn wait(&self) {
        self.notify.notified().await;
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of times [`raise`](Self::raise) was called.
    pub fn raised(&self) -> u64 {
        self.raised.load(Ordering::Relaxed)
    }

    /// Number of completed waits.
    pub fn wakeups(&self) -> u64 {
        self.wakeups.load(Ordering::Relaxed)
    }
}
