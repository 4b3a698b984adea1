//! Building a channel and running its endpoints.

use std::sync::Arc;
use std::time::Duration;

use mailbox_core::{CSR_INDEX, CodecError, EmbeddedCsr, RegisterFile, SplitCsr};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::{CsrLayout, MailboxConfig, TransferMode};
use crate::endpoint::{Endpoint, Inbound, Outbound, PeerId, Wiring};
use crate::error::{TransportError, TransportResult};
use crate::gate::SendGate;
use crate::metrics::EndpointMetrics;
use crate::notify::Notification;
use crate::task::TaskProvider;
use crate::upstream::{MessageSink, MessageSource};

/// Factory for a pair of cross-wired endpoints.
#[derive(Debug, Clone, Copy)]
pub struct MailboxChannel;

impl MailboxChannel {
    /// Create both endpoints with initialized control registers.
    ///
    /// Each endpoint reads its own register file and writes the other's; the
    /// signal one endpoint raises is the one the other waits on.
    pub fn new(config: MailboxConfig) -> TransportResult<(Endpoint, Endpoint)> {
        config.validate()?;

        let files = [Arc::new(RegisterFile::new()), Arc::new(RegisterFile::new())];
        for file in &files {
            match config.transfer {
                TransferMode::Streaming {
                    layout: CsrLayout::Embedded,
                } => file.write_register(CSR_INDEX, &EmbeddedCsr::initial()),
                TransferMode::Streaming {
                    layout: CsrLayout::Split,
                } => file.write_register(CSR_INDEX, &SplitCsr::initial()),
                // An all-zero file already has an empty chunk-control register.
                TransferMode::Chunked { .. } => {}
            }
        }
        let signals = [Arc::new(Notification::new()), Arc::new(Notification::new())];

        let wire = |id: PeerId, own: usize, peer: usize| Wiring {
            id,
            own: files[own].clone(),
            peer: files[peer].clone(),
            inbound: signals[own].clone(),
            outbound: signals[peer].clone(),
            gate: Arc::new(SendGate::new()),
            metrics: Arc::new(EndpointMetrics::default()),
        };

        debug!(mode = config.transfer.name(), "mailbox channel created");
        Ok((
            Endpoint::new(config.clone(), wire(PeerId::A, 0, 1)),
            Endpoint::new(config, wire(PeerId::B, 1, 0)),
        ))
    }
}

/// Join handles of a spawned endpoint.
#[derive(Debug)]
pub struct EndpointTasks {
    /// Completes when the source is exhausted or a send fails fatally.
    pub outbound: JoinHandle<TransportResult<()>>,
    /// Completes only when a register fails to decode.
    pub inbound: JoinHandle<TransportResult<()>>,
}

impl EndpointTasks {
    /// Abort both activities.
    pub fn abort(&self) {
        self.outbound.abort();
        self.inbound.abort();
    }
}

/// Spawn the outbound and inbound activities of `endpoint`.
pub fn spawn_endpoint<P, Src, Snk>(
    provider: &P,
    endpoint: Endpoint,
    source: Src,
    sink: Snk,
) -> EndpointTasks
where
    P: TaskProvider,
    Src: MessageSource + 'static,
    Snk: MessageSink + 'static,
{
    let id = endpoint.id();
    let send_interval = endpoint.config().send_interval;
    let (outbound, inbound) = endpoint.split();

    EndpointTasks {
        outbound: provider.spawn_task(
            &format!("mailbox_outbound_{id}"),
            drive_outbound(id, outbound, source, send_interval),
        ),
        inbound: provider.spawn_task(
            &format!("mailbox_inbound_{id}"),
            drive_inbound(id, inbound, sink),
        ),
    }
}

/// Pull messages from `source` and write them to the peer.
///
/// A message refused by a disabled peer, or one too large to count in
/// chunks, is dropped and the loop moves on. Any other error stops the
/// activity.
pub async fn drive_outbound<Src: MessageSource>(
    id: PeerId,
    mut outbound: Outbound,
    mut source: Src,
    send_interval: Duration,
) -> TransportResult<()> {
    while let Some(message) = source.next_message().await {
        match outbound.send(&message).await {
            Ok(()) => {}
            Err(TransportError::PeerDisabled { peer }) => {
                warn!(endpoint = %id, %peer, bytes = message.len(), "peer disabled, dropping message");
            }
            Err(TransportError::Codec(e @ CodecError::TooManyChunks { .. })) => {
                warn!(endpoint = %id, error = %e, "message too large, dropping it");
            }
            Err(e) => {
                error!(endpoint = %id, error = %e, "outbound activity stopped");
                return Err(e);
            }
        }
        if !send_interval.is_zero() {
            tokio::time::sleep(send_interval).await;
        }
    }
    debug!(endpoint = %id, "message source exhausted");
    Ok(())
}

/// Process inbound wakeups forever, delivering into `sink`.
pub async fn drive_inbound<Snk: MessageSink>(
    id: PeerId,
    inbound: Inbound,
    sink: Snk,
) -> TransportResult<()> {
    let result = inbound.run(sink).await;
    if let Err(e) = &result {
        error!(endpoint = %id, error = %e, "inbound activity stopped");
    }
    result
}
