//! Error types for the mailbox transport.

use mailbox_core::{CodecError, CsrError};
use thiserror::Error;

use crate::endpoint::PeerId;

/// Errors raised by endpoint operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// A shared register did not decode; the peer corrupted the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] CsrError),

    /// The outbound payload could not be sliced into chunks.
    #[error("cannot slice message: {0}")]
    Codec(#[from] CodecError),

    /// The peer cleared the enable bit of its receive window.
    #[error("endpoint {peer} has disabled its receive window")]
    PeerDisabled {
        /// The receiving endpoint.
        peer: PeerId,
    },

    /// The send gate was closed while waiting on it.
    #[error("send gate closed")]
    GateClosed,

    /// The operation does not exist in the configured transfer mode.
    #[error("{operation} is not supported in {mode} mode")]
    Unsupported {
        /// Transfer mode name.
        mode: &'static str,
        /// Operation name.
        operation: &'static str,
    },

    /// The channel configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors found while validating a [`MailboxConfig`](crate::MailboxConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Chunk size is unusable.
    #[error("chunk size: {0}")]
    ChunkSize(#[from] CodecError),

    /// Polling needs the notify bit, which only the streaming CSRs carry.
    #[error("poll notification requires streaming transfer")]
    PollingRequiresStreaming,
}
