//! Per-endpoint counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters for one endpoint.
#[derive(Debug, Default)]
pub struct EndpointMetrics {
    pub(crate) messages_sent: AtomicU64,
    pub(crate) messages_refused: AtomicU64,
    pub(crate) bytes_sent: AtomicU64,
    pub(crate) words_sent: AtomicU64,
    pub(crate) full_polls: AtomicU64,
    pub(crate) deliveries: AtomicU64,
    pub(crate) bytes_received: AtomicU64,
    pub(crate) spurious_wakeups: AtomicU64,
    pub(crate) signals_raised: AtomicU64,
    pub(crate) chunks_sent: AtomicU64,
    pub(crate) chunks_received: AtomicU64,
    pub(crate) acks_sent: AtomicU64,
    pub(crate) acks_received: AtomicU64,
    pub(crate) fragments_discarded: AtomicU64,
}

/// Point-in-time copy of [`EndpointMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Outbound messages fully written.
    pub messages_sent: u64,
    /// Outbound messages refused by a disabled peer.
    pub messages_refused: u64,
    /// Payload bytes written, padding excluded.
    pub bytes_sent: u64,
    /// Words written to the peer.
    pub words_sent: u64,
    /// Checks that found the peer ring full.
    pub full_polls: u64,
    /// Buffers handed to the upstream sink.
    pub deliveries: u64,
    /// Bytes handed to the upstream sink, padding included.
    pub bytes_received: u64,
    /// Wakeups that found nothing to read.
    pub spurious_wakeups: u64,
    /// Signals raised towards the peer.
    pub signals_raised: u64,
    /// Data chunks written.
    pub chunks_sent: u64,
    /// Data chunks read.
    pub chunks_received: u64,
    /// Acknowledgements written.
    pub acks_sent: u64,
    /// Acknowledgements read.
    pub acks_received: u64,
    /// Fragments thrown away by reassembly.
    pub fragments_discarded: u64,
}

impl EndpointMetrics {
    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        Self::add(counter, 1);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            messages_sent: get(&self.messages_sent),
            messages_refused: get(&self.messages_refused),
            bytes_sent: get(&self.bytes_sent),
            words_sent: get(&self.words_sent),
            full_polls: get(&self.full_polls),
            deliveries: get(&self.deliveries),
            bytes_received: get(&self.bytes_received),
            spurious_wakeups: get(&self.spurious_wakeups),
            signals_raised: get(&self.signals_raised),
            chunks_sent: get(&self.chunks_sent),
            chunks_received: get(&self.chunks_received),
            acks_sent: get(&self.acks_sent),
            acks_received: get(&self.acks_received),
            fragments_discarded: get(&self.fragments_discarded),
        }
    }
}
