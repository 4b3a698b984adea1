//! Mailbox demo - two endpoints talking through shared registers.
//!
//! Endpoint A sends a batch of generated messages to endpoint B (and B back
//! to A with `--bidirectional`). Every delivery is logged with its padding
//! trimmed, and both endpoints' counters are printed at the end.
//!
//! # Usage
//!
//! Streaming with the embedded cursor layout:
//! ```bash
//! cargo run --bin mailbox-demo -- --messages 20 --size 300
//! ```
//!
//! Chunked transfer, both directions:
//! ```bash
//! cargo run --bin mailbox-demo -- --mode chunked --size 1200 --bidirectional
//! ```
//!
//! From a JSON configuration file:
//! ```bash
//! cargo run --bin mailbox-demo -- --config mailbox.json
//! ```

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mailbox::prelude::*;
use mailbox::{MAX_CHUNK_BYTES, codec};
use tokio::task::LocalSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Streaming,
    Chunked,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Layout {
    Embedded,
    Split,
}

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "mailbox-demo")]
#[command(about = "Exchange messages between two mailbox endpoints", long_about = None)]
struct Args {
    /// JSON configuration file; overrides the mode flags below
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transfer mode
    #[arg(long, value_enum, default_value = "streaming")]
    mode: Mode,

    /// Cursor layout for streaming mode
    #[arg(long, value_enum, default_value = "embedded")]
    layout: Layout,

    /// Largest chunk in chunked mode, a multiple of 8
    #[arg(long, default_value_t = MAX_CHUNK_BYTES)]
    chunk_bytes: usize,

    /// Poll the notify bit every N milliseconds instead of waiting on the signal
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Milliseconds between outbound messages
    #[arg(long, default_value = "0")]
    rate_ms: u64,

    /// Milliseconds between checks while the peer ring is full
    #[arg(long, default_value = "0")]
    full_poll_ms: u64,

    /// Messages per direction
    #[arg(short, long, default_value = "10")]
    messages: usize,

    /// Bytes per message
    #[arg(short, long, default_value = "100")]
    size: usize,

    /// Let endpoint B send as well
    #[arg(long)]
    bidirectional: bool,

    /// Give up waiting for deliveries after this many seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,
}

impl Args {
    fn mailbox_config(&self) -> Result<MailboxConfig, Box<dyn std::error::Error>> {
        if let Some(path) = &self.config {
            return Ok(load_config(path)?);
        }
        let transfer = match self.mode {
            Mode::Streaming => TransferMode::Streaming {
                layout: match self.layout {
                    Layout::Embedded => CsrLayout::Embedded,
                    Layout::Split => CsrLayout::Split,
                },
            },
            Mode::Chunked => TransferMode::Chunked {
                max_chunk_bytes: self.chunk_bytes,
            },
        };
        let notify = match self.poll_ms {
            Some(ms) => NotifyMode::Poll {
                interval: Duration::from_millis(ms),
            },
            None => NotifyMode::Interrupt,
        };
        Ok(MailboxConfig {
            transfer,
            notify,
            send_interval: Duration::from_millis(self.rate_ms),
            full_poll_interval: Duration::from_millis(self.full_poll_ms),
            ..MailboxConfig::default()
        })
    }
}

fn generate(from: PeerId, count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            let mut message = format!("{from}->{}#{i:04}:", from.peer()).into_bytes();
            let filler = b"abcdefghijklmnopqrstuvwxyz";
            message.extend(filler.iter().cycle().take(size.saturating_sub(message.len())));
            message.truncate(size);
            message
        })
        .collect()
}

fn padded_len(messages: &[Vec<u8>]) -> u64 {
    messages
        .iter()
        .map(|m| (m.len() + codec::padding_for(m.len())) as u64)
        .sum()
}

fn logging_sink(at: PeerId, pad: u8, received: Rc<Cell<u64>>) -> impl MessageSink {
    sink_fn(move |payload: Vec<u8>| {
        received.set(received.get() + payload.len() as u64);
        let text = String::from_utf8_lossy(trim_padding(&payload, pad));
        tracing::info!(endpoint = %at, bytes = payload.len(), "delivered: {}", text);
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mailbox=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = args.mailbox_config()?;
    let pad = config.pad_byte;
    tracing::info!(
        mode = config.transfer.name(),
        messages = args.messages,
        size = args.size,
        bidirectional = args.bidirectional,
        "starting mailbox demo"
    );

    let (a, b) = MailboxChannel::new(config)?;
    let a_metrics = a.metrics();
    let b_metrics = b.metrics();

    let from_a = generate(PeerId::A, args.messages, args.size);
    let from_b = if args.bidirectional {
        generate(PeerId::B, args.messages, args.size)
    } else {
        Vec::new()
    };
    let expect_at_b = padded_len(&from_a);
    let expect_at_a = padded_len(&from_b);

    let received_a = Rc::new(Cell::new(0u64));
    let received_b = Rc::new(Cell::new(0u64));

    let local = LocalSet::new();
    let outcome = local
        .run_until(async {
            let provider = TokioTaskProvider;
            let a_tasks = spawn_endpoint(
                &provider,
                a,
                IterSource::new(from_a),
                logging_sink(PeerId::A, pad, received_a.clone()),
            );
            let b_tasks = spawn_endpoint(
                &provider,
                b,
                IterSource::new(from_b),
                logging_sink(PeerId::B, pad, received_b.clone()),
            );

            let drained = tokio::time::timeout(Duration::from_secs(args.timeout_secs), async {
                while received_a.get() < expect_at_a || received_b.get() < expect_at_b {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await;

            a_tasks.abort();
            b_tasks.abort();
            drained
        })
        .await;

    if outcome.is_err() {
        tracing::warn!(
            received_at_a = received_a.get(),
            received_at_b = received_b.get(),
            "timed out waiting for deliveries"
        );
    }

    tracing::info!(
        "endpoint A: {}",
        serde_json::to_string(&a_metrics.snapshot())?
    );
    tracing::info!(
        "endpoint B: {}",
        serde_json::to_string(&b_metrics.snapshot())?
    );
    Ok(())
}
