//! # Mailbox Transport Layer
//!
//! Message passing between two endpoints that share nothing but a pair of
//! register files and a pair of wakeup signals.
//!
//! This crate provides:
//! - **Streaming transfer**: a byte stream through a ring of payload words,
//!   with cursors embedded in one register or split across both
//! - **Chunked transfer**: chunk-at-a-time writes gated on the peer's
//!   acknowledgement, reassembled into whole messages
//! - **Endpoints**: outbound and inbound halves run as independent tasks
//! - **Upstream seams**: [`MessageSource`] and [`MessageSink`]

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// Re-export core types for convenience
pub use mailbox_core::{CodecError, CsrError, PAD_BYTE, RegisterFile, codec};

// =============================================================================
// Modules
// =============================================================================

/// Channel construction and endpoint activities.
pub mod channel;

/// Channel configuration.
pub mod config;

/// Endpoint halves for both transfer modes.
pub mod endpoint;

/// Error types for transport operations.
pub mod error;

/// Single-permit gate of the chunked mode.
pub mod gate;

/// Per-endpoint counters.
pub mod metrics;

/// Wakeup signals between endpoints.
pub mod notify;

/// Task spawning.
pub mod task;

/// Traits connecting endpoints to the modules above them.
pub mod upstream;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use channel::{EndpointTasks, MailboxChannel, drive_inbound, drive_outbound, spawn_endpoint};
pub use config::{CsrLayout, MailboxConfig, NotifyMode, TransferMode};
pub use endpoint::{
    ChunkReceiver, ChunkSender, Endpoint, Inbound, Outbound, PeerId, ReceiveWindow,
    StreamReceiver, StreamSender,
};
pub use error::{ConfigError, TransportError, TransportResult};
pub use gate::SendGate;
pub use metrics::{EndpointMetrics, MetricsSnapshot};
pub use notify::Notification;
pub use task::{TaskProvider, TokioTaskProvider};
pub use upstream::{FnSink, IterSource, MessageSink, MessageSource, sink_fn};
