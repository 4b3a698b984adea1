//! End-to-end tests of the streaming transfer mode.

mod common;

use std::time::Duration;

use common::{collect_bytes, padded, payload, run_local, wait_until};
use mailbox_core::{CSR_INDEX, EmbeddedCsr, RING_CAPACITY_BYTES, SplitCsr};
use mailbox_transport::{
    Inbound, IterSource, MailboxChannel, MailboxConfig, TokioTaskProvider, TransportError,
    spawn_endpoint,
};
use tokio::sync::mpsc;

fn no_messages() -> IterSource<std::vec::IntoIter<Vec<u8>>> {
    IterSource::new(Vec::new())
}

/// Two 300-byte sends exceed the 496-byte ring; the second waits for the
/// consumer and everything arrives byte-exact with one pad run per send.
#[test]
fn test_two_sends_larger_than_ring() {
    run_local(async {
        let (a, b) = MailboxChannel::new(MailboxConfig::streaming()).expect("channel");
        let a_metrics = a.metrics();
        let first = payload(300, 0);
        let second = payload(300, 7);
        let provider = TokioTaskProvider;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let a_tasks = spawn_endpoint(
            &provider,
            a,
            IterSource::new(vec![first.clone(), second.clone()]),
            Vec::<Vec<u8>>::new(),
        );
        let b_tasks = spawn_endpoint(&provider, b, no_messages(), tx);

        let mut expected = padded(&first);
        expected.extend(padded(&second));
        assert_eq!(expected.len(), 608);

        let received = collect_bytes(&mut rx, expected.len()).await;
        assert_eq!(received, expected);

        // The source is exhausted once the second send completed.
        wait_until(|| a_tasks.outbound.is_finished()).await;
        assert!(a_metrics.snapshot().full_polls > 0);
        a_tasks.abort();
        b_tasks.abort();
    });
}

/// Sends that fit the ring, with no read in between, arrive as one span.
#[test]
fn test_sends_within_capacity_concatenate() {
    run_local(async {
        let (a, b) = MailboxChannel::new(MailboxConfig::streaming()).expect("channel");
        let (mut outbound, _) = a.split();
        let (_, mut inbound) = b.split();

        let sends = [payload(13, 1), payload(64, 2), payload(3, 3), payload(200, 4)];
        let mut expected = Vec::new();
        for send in &sends {
            outbound.send(send).await.expect("send");
            expected.extend(padded(send));
        }
        assert!(expected.len() <= RING_CAPACITY_BYTES);

        let mut deliveries: Vec<Vec<u8>> = Vec::new();
        assert_eq!(inbound.receive_once(&mut deliveries).await.expect("receive"), 1);
        assert_eq!(deliveries, vec![expected]);
    });
}

/// A write into the peer's ring touches only the peer's CSR.
#[test]
fn test_notify_bit_isolated_per_direction() {
    run_local(async {
        let (a, b) = MailboxChannel::new(MailboxConfig::streaming()).expect("channel");
        let a_regs = a.registers().clone();
        let b_regs = b.registers().clone();
        let (mut outbound, _) = a.split();

        outbound.send(b"ping").await.expect("send");

        let a_csr: EmbeddedCsr = a_regs.read_register(CSR_INDEX).expect("csr");
        let b_csr: EmbeddedCsr = b_regs.read_register(CSR_INDEX).expect("csr");
        assert_eq!(a_csr, EmbeddedCsr::initial());
        assert!(b_csr.notify);
        assert_eq!((b_csr.head, b_csr.tail), (0, 1));
    });
}

/// Both endpoints stream at once over the split layout.
#[test]
fn test_split_layout_bidirectional() {
    run_local(async {
        let (a, b) = MailboxChannel::new(MailboxConfig::split_streaming()).expect("channel");
        let a_regs = a.registers().clone();
        let b_regs = b.registers().clone();
        let provider = TokioTaskProvider;

        let from_a: Vec<Vec<u8>> = (0..20).map(|i| payload(40 + i * 13, i as u8)).collect();
        let from_b: Vec<Vec<u8>> = (0..20).map(|i| payload(700 - i * 11, i as u8)).collect();
        let expect_at_b: Vec<u8> = from_a.iter().flat_map(|m| padded(m)).collect();
        let expect_at_a: Vec<u8> = from_b.iter().flat_map(|m| padded(m)).collect();

        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        let a_tasks = spawn_endpoint(&provider, a, IterSource::new(from_a), a_tx);
        let b_tasks = spawn_endpoint(&provider, b, IterSource::new(from_b), b_tx);

        assert_eq!(collect_bytes(&mut b_rx, expect_at_b.len()).await, expect_at_b);
        assert_eq!(collect_bytes(&mut a_rx, expect_at_a.len()).await, expect_at_a);

        // Both rings drained: each head, kept in the peer's register, caught
        // up with the tail kept in the owner's register.
        let a_csr: SplitCsr = a_regs.read_register(CSR_INDEX).expect("csr");
        let b_csr: SplitCsr = b_regs.read_register(CSR_INDEX).expect("csr");
        assert_eq!(b_csr.tx_head, a_csr.rx_tail);
        assert_eq!(a_csr.tx_head, b_csr.rx_tail);
        assert!(a_csr.enabled && b_csr.enabled);

        a_tasks.abort();
        b_tasks.abort();
    });
}

/// A disabled receiver makes its peer drop messages until re-enabled.
#[test]
fn test_disabled_peer_drops_messages() {
    run_local(async {
        let (a, b) = MailboxChannel::new(MailboxConfig::streaming()).expect("channel");
        let a_metrics = a.metrics();
        let window = b.receive_window().expect("streaming window");
        window.set_enabled(false).expect("disable");

        let (mut outbound, _) = a.split();
        let err = outbound.send(b"refused").await.expect_err("disabled");
        assert!(matches!(err, TransportError::PeerDisabled { .. }));

        let provider = TokioTaskProvider;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let b_tasks = spawn_endpoint(&provider, b, no_messages(), tx);
        window.set_enabled(true).expect("enable");

        outbound.send(b"accepted").await.expect("send");
        assert_eq!(collect_bytes(&mut rx, 8).await, b"accepted".to_vec());

        let snapshot = a_metrics.snapshot();
        assert_eq!(snapshot.messages_refused, 1);
        assert_eq!(snapshot.messages_sent, 1);
        b_tasks.abort();
    });
}

/// Polling consumers find data through the notify bit alone.
#[test]
fn test_poll_mode_delivers() {
    run_local(async {
        let config = MailboxConfig::polling(Duration::from_millis(1));
        let (a, b) = MailboxChannel::new(config).expect("channel");
        let b_metrics = b.metrics();
        let provider = TokioTaskProvider;

        let messages: Vec<Vec<u8>> = (0..5).map(|i| payload(120, i)).collect();
        let expected: Vec<u8> = messages.iter().flat_map(|m| padded(m)).collect();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let a_tasks = spawn_endpoint(&provider, a, IterSource::new(messages), Vec::<Vec<u8>>::new());
        let b_tasks = spawn_endpoint(&provider, b, no_messages(), tx);

        assert_eq!(collect_bytes(&mut rx, expected.len()).await, expected);
        wait_until(|| b_metrics.snapshot().bytes_received == expected.len() as u64).await;

        a_tasks.abort();
        b_tasks.abort();
    });
}

/// Pacing spreads messages out without changing what arrives.
#[test]
fn test_send_interval_paces_messages() {
    run_local(async {
        let config = MailboxConfig::streaming().with_send_interval(Duration::from_millis(5));
        let (a, b) = MailboxChannel::new(config).expect("channel");
        let b_metrics = b.metrics();
        let provider = TokioTaskProvider;

        let messages: Vec<Vec<u8>> = (0..4).map(|i| payload(16, i)).collect();
        let expected: Vec<u8> = messages.iter().flatten().copied().collect();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let a_tasks = spawn_endpoint(&provider, a, IterSource::new(messages), Vec::<Vec<u8>>::new());
        let b_tasks = spawn_endpoint(&provider, b, no_messages(), tx);

        assert_eq!(collect_bytes(&mut rx, expected.len()).await, expected);
        // Each paced message is drained before the next one is written.
        assert_eq!(b_metrics.snapshot().deliveries, 4);

        a_tasks.abort();
        b_tasks.abort();
    });
}

/// A malformed control register stops the inbound activity with an error.
#[test]
fn test_corrupt_csr_stops_inbound() {
    run_local(async {
        let config = MailboxConfig::polling(Duration::ZERO);
        let (_a, b) = MailboxChannel::new(config).expect("channel");
        let b_regs = b.registers().clone();
        let (_, inbound) = b.split();
        assert!(matches!(inbound, Inbound::Streaming(_)));

        let handle = tokio::task::spawn_local(inbound.run(Vec::<Vec<u8>>::new()));
        tokio::task::yield_now().await;
        b_regs.store(CSR_INDEX, 0x3 << 60);

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("inbound did not stop")
            .expect("join");
        assert!(matches!(result, Err(TransportError::Protocol(_))));
    });
}
