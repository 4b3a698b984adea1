//! End-to-end tests of the chunked transfer mode.

mod common;

use common::{collect_deliveries, padded, payload, run_local, wait_until};
use mailbox_core::MAX_CHUNK_BYTES;
use mailbox_transport::{
    IterSource, MailboxChannel, MailboxConfig, TokioTaskProvider, TransferMode, spawn_endpoint,
};
use tokio::sync::mpsc;

fn no_messages() -> IterSource<std::vec::IntoIter<Vec<u8>>> {
    IterSource::new(Vec::new())
}

/// 1200 bytes in 504-byte chunks: three chunks, three acks, one delivery.
#[test]
fn test_message_split_into_three_chunks() {
    run_local(async {
        let (a, b) = MailboxChannel::new(MailboxConfig::chunked()).expect("channel");
        let a_metrics = a.metrics();
        let b_metrics = b.metrics();
        let provider = TokioTaskProvider;
        let message = payload(1200, 3);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let a_tasks = spawn_endpoint(
            &provider,
            a,
            IterSource::new(vec![message.clone()]),
            Vec::<Vec<u8>>::new(),
        );
        let b_tasks = spawn_endpoint(&provider, b, no_messages(), tx);

        let deliveries = collect_deliveries(&mut rx, 1).await;
        assert_eq!(deliveries, vec![message]);

        wait_until(|| a_metrics.snapshot().acks_received == 3).await;
        let sent = a_metrics.snapshot();
        let received = b_metrics.snapshot();
        assert_eq!(sent.chunks_sent, 3);
        assert_eq!(sent.messages_sent, 1);
        assert_eq!(received.chunks_received, 3);
        assert_eq!(received.acks_sent, 3);
        assert_eq!(received.deliveries, 1);
        assert!(rx.try_recv().is_err());

        a_tasks.abort();
        b_tasks.abort();
    });
}

/// Messages are delivered whole and in order, padding on the last chunk only.
#[test]
fn test_messages_delivered_whole() {
    run_local(async {
        let config = MailboxConfig {
            transfer: TransferMode::Chunked {
                max_chunk_bytes: 64,
            },
            ..MailboxConfig::default()
        };
        let (a, b) = MailboxChannel::new(config).expect("channel");
        let provider = TokioTaskProvider;
        let messages = vec![payload(5, 0), payload(64, 1), payload(130, 2), Vec::new()];

        let (tx, mut rx) = mpsc::unbounded_channel();
        let a_tasks = spawn_endpoint(
            &provider,
            a,
            IterSource::new(messages.clone()),
            Vec::<Vec<u8>>::new(),
        );
        let b_tasks = spawn_endpoint(&provider, b, no_messages(), tx);

        // The empty message produces no chunk and no delivery.
        let deliveries = collect_deliveries(&mut rx, 3).await;
        let expected: Vec<Vec<u8>> = messages[..3].iter().map(|m| padded(m)).collect();
        assert_eq!(deliveries, expected);

        a_tasks.abort();
        b_tasks.abort();
    });
}

/// Data and acknowledgements share each chunk-control register without loss.
#[test]
fn test_bidirectional_chunked_traffic() {
    run_local(async {
        let (a, b) = MailboxChannel::new(MailboxConfig::chunked()).expect("channel");
        let a_metrics = a.metrics();
        let b_metrics = b.metrics();
        let provider = TokioTaskProvider;

        let from_a: Vec<Vec<u8>> = (0..10)
            .map(|i| payload(MAX_CHUNK_BYTES * 2 + i * 8, i as u8))
            .collect();
        let from_b: Vec<Vec<u8>> = (0..10).map(|i| payload(100 + i * 16, i as u8)).collect();

        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        let a_tasks = spawn_endpoint(&provider, a, IterSource::new(from_a.clone()), a_tx);
        let b_tasks = spawn_endpoint(&provider, b, IterSource::new(from_b.clone()), b_tx);

        assert_eq!(collect_deliveries(&mut b_rx, 10).await, from_a);
        let padded_b: Vec<Vec<u8>> = from_b.iter().map(|m| padded(m)).collect();
        assert_eq!(collect_deliveries(&mut a_rx, 10).await, padded_b);

        wait_until(|| {
            let a = a_metrics.snapshot();
            let b = b_metrics.snapshot();
            a.acks_received == b.chunks_received && b.acks_received == a.chunks_received
        })
        .await;
        assert_eq!(a_metrics.snapshot().fragments_discarded, 0);
        assert_eq!(b_metrics.snapshot().fragments_discarded, 0);

        a_tasks.abort();
        b_tasks.abort();
    });
}
