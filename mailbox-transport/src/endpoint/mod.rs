//! The two sides of a mailbox.
//!
//! An [`Endpoint`] owns one register file and writes into its peer's. It
//! splits into an [`Outbound`] half, which writes messages into the peer's
//! registers, and an [`Inbound`] half, which reads what the peer wrote into
//! the own registers. The halves share nothing mutable besides the registers
//! themselves, the send gate and the counters, so they run as independent
//! tasks.

mod chunked;
mod stream;

use std::fmt;
use std::sync::Arc;

use mailbox_core::RegisterFile;

use crate::config::{MailboxConfig, TransferMode};
use crate::error::{TransportError, TransportResult};
use crate::gate::SendGate;
use crate::metrics::EndpointMetrics;
use crate::notify::Notification;
use crate::upstream::MessageSink;

pub use chunked::{ChunkReceiver, ChunkSender};
pub use stream::{ReceiveWindow, StreamReceiver, StreamSender};

/// Identity of an endpoint within its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerId {
    /// First endpoint.
    A,
    /// Second endpoint.
    B,
}

impl PeerId {
    /// The other endpoint of the channel.
    pub fn peer(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Shared handles of one endpoint.
#[derive(Debug, Clone)]
pub(crate) struct Wiring {
    pub(crate) id: PeerId,
    /// Registers this endpoint reads from.
    pub(crate) own: Arc<RegisterFile>,
    /// Registers this endpoint writes into.
    pub(crate) peer: Arc<RegisterFile>,
    /// Raised by the peer when it wrote into `own`.
    pub(crate) inbound: Arc<Notification>,
    /// Raised by this endpoint when it wrote into `peer`.
    pub(crate) outbound: Arc<Notification>,
    /// Gate of chunks flowing from this endpoint to the peer.
    pub(crate) gate: Arc<SendGate>,
    pub(crate) metrics: Arc<EndpointMetrics>,
}

/// One side of a mailbox channel.
#[derive(Debug)]
pub struct Endpoint {
    config: MailboxConfig,
    wiring: Wiring,
}

impl Endpoint {
    pub(crate) fn new(config: MailboxConfig, wiring: Wiring) -> Self {
        Self { config, wiring }
    }

    /// Identity within the channel.
    pub fn id(&self) -> PeerId {
        self.wiring.id
    }

    /// Channel configuration.
    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }

    /// Counters of this endpoint.
    pub fn metrics(&self) -> Arc<EndpointMetrics> {
        self.wiring.metrics.clone()
    }

    /// The register file the peer writes into.
    pub fn registers(&self) -> &Arc<RegisterFile> {
        &self.wiring.own
    }

    /// Handle to the enable bit of the own receive ring.
    ///
    /// Stays usable after [`split`](Self::split) hands the halves to tasks.
    pub fn receive_window(&self) -> TransportResult<ReceiveWindow> {
        match self.config.transfer {
            TransferMode::Streaming { layout } => Ok(ReceiveWindow::new(layout, &self.wiring)),
            TransferMode::Chunked { .. } => Err(TransportError::Unsupported {
                mode: "chunked",
                operation: "receive window control",
            }),
        }
    }

    /// Split into independently driven halves.
    pub fn split(self) -> (Outbound, Inbound) {
        let Self { config, wiring } = self;
        match config.transfer {
            TransferMode::Streaming { layout } => (
                Outbound::Streaming(StreamSender::new(&config, layout, &wiring)),
                Inbound::Streaming(StreamReceiver::new(&config, layout, &wiring)),
            ),
            TransferMode::Chunked { max_chunk_bytes } => (
                Outbound::Chunked(ChunkSender::new(&config, max_chunk_bytes, &wiring)),
                Inbound::Chunked(ChunkReceiver::new(&wiring)),
            ),
        }
    }
}

/// Sending half of an endpoint.
#[derive(Debug)]
pub enum Outbound {
    /// Ring writer.
    Streaming(StreamSender),
    /// Chunk writer.
    Chunked(ChunkSender),
}

impl Outbound {
    /// Write one message into the peer's registers.
    ///
    /// Returns once every byte has been handed over; in chunked mode the
    /// acknowledgement of the final chunk may still be outstanding.
    pub async fn send(&mut self, payload: &[u8]) -> TransportResult<()> {
        match self {
            Self::Streaming(sender) => sender.send(payload).await,
            Self::Chunked(sender) => sender.send(payload).await,
        }
    }
}

/// Receiving half of an endpoint.
#[derive(Debug)]
pub enum Inbound {
    /// Ring reader.
    Streaming(StreamReceiver),
    /// Chunk reader.
    Chunked(ChunkReceiver),
}

impl Inbound {
    /// Wait for one wakeup and process what it announced.
    ///
    /// Returns the number of buffers delivered to `sink`, which may be zero
    /// for spurious wakeups, acknowledgements and partial messages.
    pub async fn receive_once<S: MessageSink>(&mut self, sink: &mut S) -> TransportResult<usize> {
        match self {
            Self::Streaming(receiver) => receiver.receive_once(sink).await,
            Self::Chunked(receiver) => receiver.receive_once(sink).await,
        }
    }

    /// Process wakeups until a register fails to decode.
    pub async fn run<S: MessageSink>(mut self, mut sink: S) -> TransportResult<()> {
        loop {
            self.receive_once(&mut sink).await?;
        }
    }

    /// Open or close the receive window.
    ///
    /// A closed window makes the peer refuse new messages.
    pub fn set_enabled(&self, enabled: bool) -> TransportResult<()> {
        match self {
            Self::Streaming(receiver) => receiver.set_enabled(enabled),
            Self::Chunked(_) => Err(TransportError::Unsupported {
                mode: "chunked",
                operation: "receive window control",
            }),
        }
    }
}
