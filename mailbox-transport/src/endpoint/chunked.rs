//! Chunk-at-a-time transfer with per-chunk acknowledgement.
//!
//! Register 0 of each file is the chunk-control register and registers
//! `1..64` carry payload. Both endpoints write into slot 0 of the other's
//! file: the outbound half installs data descriptors, the inbound half
//! installs acknowledgements. A value is installed only over an empty
//! register and the owner clears it after copying everything it described,
//! so neither write can overwrite the other.

use std::sync::Arc;

use mailbox_core::{
    Assembly, CHUNK_CONTROL_INDEX, CHUNK_PAYLOAD_START, ChunkControl, ChunkDescriptor,
    ControlRegister, Reassembler, RegisterFile, Word, codec,
};
use tracing::{debug, trace, warn};

use super::{PeerId, Wiring};
use crate::config::MailboxConfig;
use crate::error::TransportResult;
use crate::gate::SendGate;
use crate::metrics::EndpointMetrics;
use crate::notify::Notification;
use crate::upstream::MessageSink;

/// Install `control` into the chunk-control register of `registers`.
///
/// Waits while the register still holds a value its owner has not consumed.
async fn install_control(registers: &RegisterFile, control: ChunkControl) -> TransportResult<()> {
    let value = control.encode();
    loop {
        match registers.compare_and_install(CHUNK_CONTROL_INDEX, 0, value) {
            Ok(()) => return Ok(()),
            Err(found) => {
                // Refuse to spin on a register the peer corrupted.
                ChunkControl::decode(found)?;
                tokio::task::yield_now().await;
            }
        }
    }
}

/// Writes chunks into the peer's payload window.
#[derive(Debug)]
pub struct ChunkSender {
    id: PeerId,
    peer: Arc<RegisterFile>,
    gate: Arc<SendGate>,
    signal: Arc<Notification>,
    max_chunk_bytes: usize,
    pad_byte: u8,
    metrics: Arc<EndpointMetrics>,
}

impl ChunkSender {
    pub(crate) fn new(config: &MailboxConfig, max_chunk_bytes: usize, wiring: &Wiring) -> Self {
        Self {
            id: wiring.id,
            peer: wiring.peer.clone(),
            gate: wiring.gate.clone(),
            signal: wiring.outbound.clone(),
            max_chunk_bytes,
            pad_byte: config.pad_byte,
            metrics: wiring.metrics.clone(),
        }
    }

    /// Send `payload` as a sequence of acknowledged chunks.
    ///
    /// Each chunk waits on the send gate, which only the peer's
    /// acknowledgement of the previous chunk reopens.
    pub async fn send(&mut self, payload: &[u8]) -> TransportResult<()> {
        let chunks = match codec::split_chunks(payload, self.max_chunk_bytes) {
            Ok(chunks) => chunks,
            Err(e) => {
                EndpointMetrics::incr(&self.metrics.messages_refused);
                return Err(e.into());
            }
        };
        if chunks.is_empty() {
            return Ok(());
        }

        for chunk in &chunks {
            self.gate.acquire().await?;

            let words = codec::slice_words(chunk.bytes, self.pad_byte);
            for (offset, word) in words.iter().enumerate() {
                self.peer.write_word(CHUNK_PAYLOAD_START + offset, *word);
            }
            let descriptor = ChunkDescriptor {
                start: CHUNK_PAYLOAD_START,
                end: CHUNK_PAYLOAD_START + words.len(),
                block_index: chunk.block_index,
                block_total: chunk.block_total,
            };
            install_control(&self.peer, ChunkControl::Data(descriptor)).await?;
            self.signal.raise();
            EndpointMetrics::incr(&self.metrics.signals_raised);

            EndpointMetrics::incr(&self.metrics.chunks_sent);
            EndpointMetrics::add(&self.metrics.words_sent, words.len() as u64);
            EndpointMetrics::add(&self.metrics.bytes_sent, chunk.bytes.len() as u64);
            debug!(
                endpoint = %self.id,
                block_index = chunk.block_index,
                block_total = chunk.block_total,
                words = words.len(),
                "wrote chunk"
            );
        }

        EndpointMetrics::incr(&self.metrics.messages_sent);
        Ok(())
    }
}

/// Reads chunks from the own payload window and acknowledges them.
#[derive(Debug)]
pub struct ChunkReceiver {
    id: PeerId,
    own: Arc<RegisterFile>,
    peer: Arc<RegisterFile>,
    gate: Arc<SendGate>,
    signal: Arc<Notification>,
    peer_signal: Arc<Notification>,
    reassembler: Reassembler,
    metrics: Arc<EndpointMetrics>,
}

impl ChunkReceiver {
    pub(crate) fn new(wiring: &Wiring) -> Self {
        Self {
            id: wiring.id,
            own: wiring.own.clone(),
            peer: wiring.peer.clone(),
            gate: wiring.gate.clone(),
            signal: wiring.inbound.clone(),
            peer_signal: wiring.outbound.clone(),
            reassembler: Reassembler::new(),
            metrics: wiring.metrics.clone(),
        }
    }

    /// Wait for the peer, then handle the chunk-control value it installed.
    pub async fn receive_once<S: MessageSink>(&mut self, sink: &mut S) -> TransportResult<usize> {
        self.signal.wait().await;
        self.process(sink).await
    }

    /// Handle the current chunk-control value without waiting for a signal.
    pub async fn process<S: MessageSink>(&mut self, sink: &mut S) -> TransportResult<usize> {
        let raw = self.own.load(CHUNK_CONTROL_INDEX);
        match ChunkControl::decode(raw)? {
            ChunkControl::Empty => {
                EndpointMetrics::incr(&self.metrics.spurious_wakeups);
                trace!(endpoint = %self.id, "wakeup with empty chunk control");
                Ok(0)
            }
            ChunkControl::Ack => {
                self.clear(raw);
                EndpointMetrics::incr(&self.metrics.acks_received);
                if !self.gate.release() {
                    warn!(endpoint = %self.id, "acknowledgement without an outstanding chunk");
                }
                trace!(endpoint = %self.id, "chunk acknowledged");
                Ok(0)
            }
            ChunkControl::Data(descriptor) => {
                let words: Vec<Word> = (descriptor.start..descriptor.end)
                    .map(|index| self.own.read_word(index))
                    .collect();
                self.clear(raw);
                EndpointMetrics::incr(&self.metrics.chunks_received);
                debug!(
                    endpoint = %self.id,
                    block_index = descriptor.block_index,
                    block_total = descriptor.block_total,
                    words = descriptor.words(),
                    "read chunk"
                );

                let assembly = self.reassembler.push(
                    descriptor.block_index,
                    descriptor.block_total,
                    codec::join_words(&words),
                );
                if let Some(discarded) = self.reassembler.take_discarded() {
                    let dropped = discarded.fragments + usize::from(discarded.chunk_dropped);
                    EndpointMetrics::add(&self.metrics.fragments_discarded, dropped as u64);
                }

                let delivered = match assembly {
                    Assembly::Complete(message) => {
                        debug!(endpoint = %self.id, bytes = message.len(), "delivering message");
                        EndpointMetrics::incr(&self.metrics.deliveries);
                        EndpointMetrics::add(&self.metrics.bytes_received, message.len() as u64);
                        sink.deliver(message);
                        1
                    }
                    Assembly::Pending => 0,
                };

                // Discarded chunks are acknowledged too, or the sender would
                // wait on its gate forever.
                install_control(&self.peer, ChunkControl::Ack).await?;
                self.peer_signal.raise();
                EndpointMetrics::incr(&self.metrics.signals_raised);
                EndpointMetrics::incr(&self.metrics.acks_sent);
                Ok(delivered)
            }
        }
    }

    /// Hand the chunk-control register back to the peer.
    fn clear(&self, consumed: u64) {
        if self
            .own
            .compare_and_install(CHUNK_CONTROL_INDEX, consumed, 0)
            .is_err()
        {
            // Peer writers only install over an empty register.
            warn!(endpoint = %self.id, "chunk control changed while being consumed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MailboxChannel;
    use crate::endpoint::{Inbound, Outbound};
    use mailbox_core::MAX_CHUNK_BYTES;

    struct Halves {
        tx: ChunkSender,
        rx: ChunkReceiver,
        peer_rx: ChunkReceiver,
    }

    fn halves() -> Halves {
        let (a, b) = MailboxChannel::new(MailboxConfig::chunked()).expect("channel");
        let (a_out, a_in) = a.split();
        let (_, b_in) = b.split();
        match (a_out, a_in, b_in) {
            (Outbound::Chunked(tx), Inbound::Chunked(peer_rx), Inbound::Chunked(rx)) => {
                Halves { tx, rx, peer_rx }
            }
            _ => panic!("chunked config built streaming halves"),
        }
    }

    #[tokio::test]
    async fn test_single_chunk_round_trip() {
        let mut h = halves();
        h.tx.send(b"dog").await.expect("send");
        assert!(!h.tx.gate.is_open());

        let mut got: Vec<Vec<u8>> = Vec::new();
        assert_eq!(h.rx.process(&mut got).await.expect("data"), 1);
        assert_eq!(got, vec![b"dog     ".to_vec()]);
        assert_eq!(h.rx.own.load(CHUNK_CONTROL_INDEX), 0);

        // Acknowledgement lands in the sender's own register.
        let mut none: Vec<Vec<u8>> = Vec::new();
        assert_eq!(h.peer_rx.process(&mut none).await.expect("ack"), 0);
        assert!(h.tx.gate.is_open());
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_descriptor_spans_payload_window() {
        let mut h = halves();
        let payload = vec![7u8; MAX_CHUNK_BYTES];
        h.tx.send(&payload).await.expect("send");

        let control: ChunkControl = h.rx.own.read_register(CHUNK_CONTROL_INDEX).expect("csr");
        assert_eq!(
            control,
            ChunkControl::Data(ChunkDescriptor {
                start: 1,
                end: 64,
                block_index: 1,
                block_total: 1,
            })
        );
    }

    #[tokio::test]
    async fn test_out_of_sequence_chunk_is_discarded_and_acked() {
        let mut h = halves();
        let stray = ChunkDescriptor {
            start: 1,
            end: 2,
            block_index: 2,
            block_total: 3,
        };
        h.rx.own.store(CHUNK_CONTROL_INDEX, ChunkControl::Data(stray).encode());

        let mut got: Vec<Vec<u8>> = Vec::new();
        assert_eq!(h.rx.process(&mut got).await.expect("data"), 0);
        assert!(got.is_empty());
        assert_eq!(h.rx.own.load(CHUNK_CONTROL_INDEX), 0);

        let snapshot = h.rx.metrics.snapshot();
        assert_eq!(snapshot.fragments_discarded, 1);
        assert_eq!(snapshot.acks_sent, 1);

        let reply: ChunkControl = h.rx.peer.read_register(CHUNK_CONTROL_INDEX).expect("csr");
        assert_eq!(reply, ChunkControl::Ack);
    }

    #[tokio::test]
    async fn test_ack_follows_delivery() {
        let mut h = halves();
        h.tx.send(b"cat").await.expect("send");

        let peer = h.rx.peer.clone();
        let mut seen = Vec::new();
        let mut sink = crate::upstream::sink_fn(|message: Vec<u8>| {
            seen.push((message, peer.load(CHUNK_CONTROL_INDEX)));
        });
        assert_eq!(h.rx.process(&mut sink).await.expect("data"), 1);
        drop(sink);

        // The sender's register was still empty when the message went up.
        assert_eq!(seen, vec![(b"cat     ".to_vec(), 0)]);
        let reply: ChunkControl = peer.read_register(CHUNK_CONTROL_INDEX).expect("csr");
        assert_eq!(reply, ChunkControl::Ack);
    }

    #[tokio::test]
    async fn test_oversized_message_is_refused() {
        let config = MailboxConfig {
            transfer: crate::config::TransferMode::Chunked {
                max_chunk_bytes: 8,
            },
            ..MailboxConfig::default()
        };
        let (a, _b) = MailboxChannel::new(config).expect("channel");
        let Outbound::Chunked(mut tx) = a.split().0 else {
            panic!("chunked config built streaming halves");
        };
        let payload = vec![1u8; 8 * (codec::MAX_CHUNKS + 1)];
        let err = tx.send(&payload).await.expect_err("too many chunks");
        assert!(matches!(
            err,
            crate::TransportError::Codec(mailbox_core::CodecError::TooManyChunks { .. })
        ));
        assert_eq!(tx.metrics.snapshot().messages_refused, 1);
        assert!(tx.gate.is_open());
    }

    #[tokio::test]
    async fn test_corrupt_control_is_fatal() {
        let mut h = halves();
        h.rx.own.store(CHUNK_CONTROL_INDEX, 0x7 << 60);
        let mut got: Vec<Vec<u8>> = Vec::new();
        assert!(h.rx.process(&mut got).await.is_err());
    }
}
