//! Helpers shared by the end-to-end tests.

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::LocalSet;

/// Run `future` on a current-thread runtime inside a `LocalSet`.
pub fn run_local<F: Future>(future: F) -> F::Output {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mailbox_transport=trace")
        .with_test_writer()
        .try_init();

    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("Failed to build local runtime")
        .block_on(LocalSet::new().run_until(future))
}

/// Receive deliveries until at least `len` bytes arrived.
pub async fn collect_bytes(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>, len: usize) -> Vec<u8> {
    let collect = async {
        let mut bytes = Vec::new();
        while bytes.len() < len {
            let delivery = rx.recv().await.expect("sink dropped");
            bytes.extend(delivery);
        }
        bytes
    };
    tokio::time::timeout(Duration::from_secs(5), collect)
        .await
        .expect("deliveries did not arrive")
}

/// Receive exactly `count` deliveries.
pub async fn collect_deliveries(
    rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
    count: usize,
) -> Vec<Vec<u8>> {
    let collect = async {
        let mut deliveries = Vec::new();
        while deliveries.len() < count {
            deliveries.push(rx.recv().await.expect("sink dropped"));
        }
        deliveries
    };
    tokio::time::timeout(Duration::from_secs(5), collect)
        .await
        .expect("deliveries did not arrive")
}

/// Poll `condition` until it holds, yielding between checks.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let wait = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("condition never held");
}

/// Payload whose bytes never collide with the pad byte.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| b'a' + ((i + usize::from(seed)) % 26) as u8)
        .collect()
}

/// `payload` followed by the padding the transport appends.
pub fn padded(payload: &[u8]) -> Vec<u8> {
    let mut out = payload.to_vec();
    out.resize(
        payload.len() + mailbox_transport::codec::padding_for(payload.len()),
        mailbox_transport::PAD_BYTE,
    );
    out
}
