//! Streaming transfer through the 63-slot ring.
//!
//! The producer owns `tail` and the consumer owns `head`; where those
//! cursors live depends on the [`CsrLayout`]:
//!
//! | layout   | peer ring head        | peer ring tail         |
//! |----------|-----------------------|------------------------|
//! | embedded | peer CSR `head`       | peer CSR `tail`        |
//! | split    | own CSR `tx_head`     | peer CSR `rx_tail`     |
//!
//! Only the producer raises the notify bit and signals. Consumer head
//! updates are silent; a producer waiting on a full ring re-reads the head.

use std::sync::Arc;
use std::time::Duration;

use mailbox_core::{
    CSR_INDEX, EmbeddedCsr, EmbeddedCsrUpdate, RegisterFile, RingBuffer, SplitCsr,
    SplitCsrUpdate, WORD_SIZE, codec,
};
use tracing::{debug, trace};

use super::{PeerId, Wiring};
use crate::config::{CsrLayout, MailboxConfig, NotifyMode};
use crate::error::{TransportError, TransportResult};
use crate::metrics::EndpointMetrics;
use crate::notify::Notification;
use crate::upstream::MessageSink;

/// Cursors of one ring as read from the registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    head: usize,
    tail: usize,
    enabled: bool,
}

/// Layout-aware access to the streaming control registers of one endpoint.
#[derive(Debug, Clone)]
struct StreamCursors {
    layout: CsrLayout,
    own: Arc<RegisterFile>,
    peer: Arc<RegisterFile>,
}

impl StreamCursors {
    /// The peer's receive ring, as its producer sees it.
    fn peer_window(&self) -> TransportResult<Window> {
        match self.layout {
            CsrLayout::Embedded => {
                let csr: EmbeddedCsr = self.peer.read_register(CSR_INDEX)?;
                Ok(Window {
                    head: csr.head,
                    tail: csr.tail,
                    enabled: csr.enabled,
                })
            }
            CsrLayout::Split => {
                let peer: SplitCsr = self.peer.read_register(CSR_INDEX)?;
                let own: SplitCsr = self.own.read_register(CSR_INDEX)?;
                Ok(Window {
                    head: own.tx_head,
                    tail: peer.rx_tail,
                    enabled: peer.enabled,
                })
            }
        }
    }

    /// The own receive ring, as its consumer sees it.
    fn own_window(&self) -> TransportResult<Window> {
        match self.layout {
            CsrLayout::Embedded => {
                let csr: EmbeddedCsr = self.own.read_register(CSR_INDEX)?;
                Ok(Window {
                    head: csr.head,
                    tail: csr.tail,
                    enabled: csr.enabled,
                })
            }
            CsrLayout::Split => {
                let own: SplitCsr = self.own.read_register(CSR_INDEX)?;
                let peer: SplitCsr = self.peer.read_register(CSR_INDEX)?;
                Ok(Window {
                    head: peer.tx_head,
                    tail: own.rx_tail,
                    enabled: own.enabled,
                })
            }
        }
    }

    /// Producer: publish a new tail and raise the peer's notify bit.
    fn publish_tail(&self, tail: usize) -> TransportResult<()> {
        match self.layout {
            CsrLayout::Embedded => {
                // The consumer may have moved head since the window was read.
                let snapshot: EmbeddedCsr = self.peer.read_register(CSR_INDEX)?;
                trace!(head = snapshot.head, tail, "publishing tail");
                self.peer.update(
                    CSR_INDEX,
                    &EmbeddedCsrUpdate::new().notify(true).tail(tail),
                )?;
            }
            CsrLayout::Split => {
                trace!(tail, "publishing rx_tail");
                self.peer
                    .update(CSR_INDEX, &SplitCsrUpdate::new().notify(true).rx_tail(tail))?;
            }
        }
        Ok(())
    }

    /// Consumer: release every slot before `head`.
    fn publish_head(&self, head: usize) -> TransportResult<()> {
        match self.layout {
            CsrLayout::Embedded => {
                self.own
                    .update(CSR_INDEX, &EmbeddedCsrUpdate::new().head(head))?;
            }
            CsrLayout::Split => {
                self.peer
                    .update(CSR_INDEX, &SplitCsrUpdate::new().tx_head(head))?;
            }
        }
        Ok(())
    }

    fn clear_notify(&self) -> TransportResult<()> {
        match self.layout {
            CsrLayout::Embedded => {
                self.own
                    .update(CSR_INDEX, &EmbeddedCsrUpdate::new().notify(false))?;
            }
            CsrLayout::Split => {
                self.own
                    .update(CSR_INDEX, &SplitCsrUpdate::new().notify(false))?;
            }
        }
        Ok(())
    }

    fn notify_pending(&self) -> TransportResult<bool> {
        Ok(match self.layout {
            CsrLayout::Embedded => self.own.read_register::<EmbeddedCsr>(CSR_INDEX)?.notify,
            CsrLayout::Split => self.own.read_register::<SplitCsr>(CSR_INDEX)?.notify,
        })
    }

    fn set_enabled(&self, enabled: bool) -> TransportResult<()> {
        match self.layout {
            CsrLayout::Embedded => {
                self.own
                    .update(CSR_INDEX, &EmbeddedCsrUpdate::new().enabled(enabled))?;
            }
            CsrLayout::Split => {
                self.own
                    .update(CSR_INDEX, &SplitCsrUpdate::new().enabled(enabled))?;
            }
        }
        Ok(())
    }
}

/// Handle opening and closing an endpoint's receive ring.
///
/// Only the ring owner writes the enable bit. Producers check it before each
/// message and refuse to start one while it is clear.
#[derive(Debug, Clone)]
pub struct ReceiveWindow {
    cursors: StreamCursors,
}

impl ReceiveWindow {
    pub(crate) fn new(layout: CsrLayout, wiring: &Wiring) -> Self {
        Self {
            cursors: StreamCursors {
                layout,
                own: wiring.own.clone(),
                peer: wiring.peer.clone(),
            },
        }
    }

    /// Set the enable bit.
    pub fn set_enabled(&self, enabled: bool) -> TransportResult<()> {
        debug!(enabled, "receive window toggled");
        self.cursors.set_enabled(enabled)
    }

    /// Read the enable bit.
    pub fn is_enabled(&self) -> TransportResult<bool> {
        Ok(self.cursors.own_window()?.enabled)
    }
}

/// Writes messages into the peer's ring.
#[derive(Debug)]
pub struct StreamSender {
    id: PeerId,
    cursors: StreamCursors,
    ring: RingBuffer,
    signal: Arc<Notification>,
    pad_byte: u8,
    full_poll_interval: Duration,
    metrics: Arc<EndpointMetrics>,
}

impl StreamSender {
    pub(crate) fn new(config: &MailboxConfig, layout: CsrLayout, wiring: &Wiring) -> Self {
        Self {
            id: wiring.id,
            cursors: StreamCursors {
                layout,
                own: wiring.own.clone(),
                peer: wiring.peer.clone(),
            },
            ring: RingBuffer::new(wiring.peer.clone()),
            signal: wiring.outbound.clone(),
            pad_byte: config.pad_byte,
            full_poll_interval: config.full_poll_interval,
            metrics: wiring.metrics.clone(),
        }
    }

    /// Write `payload` into the peer's ring, waiting for room as needed.
    ///
    /// A payload larger than the free space is written in several rounds,
    /// each publishing what fit and signalling the peer. Only the final word
    /// of the payload is ever padded. An empty payload is a no-op.
    pub async fn send(&mut self, payload: &[u8]) -> TransportResult<()> {
        if payload.is_empty() {
            return Ok(());
        }

        let window = self.cursors.peer_window()?;
        if !window.enabled {
            EndpointMetrics::incr(&self.metrics.messages_refused);
            return Err(TransportError::PeerDisabled {
                peer: self.id.peer(),
            });
        }

        let mut remaining = payload;
        while !remaining.is_empty() {
            let window = self.cursors.peer_window()?;
            let free = self.ring.free_slots(window.head, window.tail);
            if free == 0 {
                EndpointMetrics::incr(&self.metrics.full_polls);
                trace!(endpoint = %self.id, head = window.head, tail = window.tail, "peer ring full");
                self.backoff().await;
                continue;
            }

            let valid_bytes = free * WORD_SIZE;
            let take = remaining.len().min(valid_bytes);
            let (now, rest) = remaining.split_at(take);
            let words = codec::slice_words(now, self.pad_byte);
            let tail = self.ring.write_span(window.tail, &words);
            self.cursors.publish_tail(tail)?;
            self.signal.raise();
            EndpointMetrics::incr(&self.metrics.signals_raised);

            EndpointMetrics::add(&self.metrics.words_sent, words.len() as u64);
            EndpointMetrics::add(&self.metrics.bytes_sent, take as u64);
            debug!(
                endpoint = %self.id,
                bytes = take,
                words = words.len(),
                tail,
                "wrote span to peer ring"
            );
            remaining = rest;
        }

        EndpointMetrics::incr(&self.metrics.messages_sent);
        Ok(())
    }

    async fn backoff(&self) {
        if self.full_poll_interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.full_poll_interval).await;
        }
    }
}

/// Drains the own ring.
#[derive(Debug)]
pub struct StreamReceiver {
    id: PeerId,
    cursors: StreamCursors,
    ring: RingBuffer,
    signal: Arc<Notification>,
    notify: NotifyMode,
    metrics: Arc<EndpointMetrics>,
}

impl StreamReceiver {
    pub(crate) fn new(config: &MailboxConfig, layout: CsrLayout, wiring: &Wiring) -> Self {
        Self {
            id: wiring.id,
            cursors: StreamCursors {
                layout,
                own: wiring.own.clone(),
                peer: wiring.peer.clone(),
            },
            ring: RingBuffer::new(wiring.own.clone()),
            signal: wiring.inbound.clone(),
            notify: config.notify,
            metrics: wiring.metrics.clone(),
        }
    }

    /// Handle to the enable bit of this ring.
    pub fn window(&self) -> ReceiveWindow {
        ReceiveWindow {
            cursors: self.cursors.clone(),
        }
    }

    /// Toggle the enable bit of this ring.
    pub fn set_enabled(&self, enabled: bool) -> TransportResult<()> {
        self.window().set_enabled(enabled)
    }

    /// Wait for the producer, then deliver everything readable.
    pub async fn receive_once<S: MessageSink>(&mut self, sink: &mut S) -> TransportResult<usize> {
        self.wait_for_data().await?;
        self.drain(sink)
    }

    /// Deliver `[head, tail)` as one buffer, without waiting.
    ///
    /// The notify bit is cleared before the cursors are read, so a producer
    /// publishing afterwards always leaves it set for the next round.
    pub fn drain<S: MessageSink>(&mut self, sink: &mut S) -> TransportResult<usize> {
        self.cursors.clear_notify()?;
        let window = self.cursors.own_window()?;
        if window.head == window.tail {
            EndpointMetrics::incr(&self.metrics.spurious_wakeups);
            trace!(endpoint = %self.id, "wakeup with empty ring");
            return Ok(0);
        }

        let words = self.ring.read_span(window.head, window.tail);
        let bytes = codec::join_words(&words);
        debug!(
            endpoint = %self.id,
            head = window.head,
            tail = window.tail,
            bytes = bytes.len(),
            "delivering span"
        );
        EndpointMetrics::incr(&self.metrics.deliveries);
        EndpointMetrics::add(&self.metrics.bytes_received, bytes.len() as u64);
        sink.deliver(bytes);

        self.cursors.publish_head(window.tail)?;
        Ok(1)
    }

    async fn wait_for_data(&self) -> TransportResult<()> {
        match self.notify {
            NotifyMode::Interrupt => {
                self.signal.wait().await;
                Ok(())
            }
            NotifyMode::Poll { interval } => loop {
                if self.cursors.notify_pending()? {
                    return Ok(());
                }
                if interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(interval).await;
                }
            },
        }
    }
}
