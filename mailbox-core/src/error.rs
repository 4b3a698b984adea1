//! Error types for register decoding and message slicing.

use thiserror::Error;

/// A control register value that does not decode into its expected layout.
///
/// Shared-register corruption implies a severe peer bug, so these errors are
/// fatal to the activity that observes them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrError {
    /// Layout tag does not belong to the register being decoded.
    #[error("unexpected register tag {found:#x} in {raw:#018x} (expected {expected})")]
    UnexpectedTag {
        /// Raw register value.
        raw: u64,
        /// Tag found in bits 60..64.
        found: u8,
        /// Human readable name of the expected layout.
        expected: &'static str,
    },

    /// Bits outside every field of the layout are set.
    #[error("reserved bits set in register {raw:#018x}")]
    ReservedBits {
        /// Raw register value.
        raw: u64,
    },

    /// A ring cursor points past the ring capacity.
    #[error("{field} cursor {value} out of range (capacity {capacity})")]
    CursorOutOfRange {
        /// Field name.
        field: &'static str,
        /// Decoded value.
        value: u64,
        /// Ring capacity.
        capacity: usize,
    },

    /// Chunk span does not fit the payload window.
    #[error("invalid chunk span [{start}, {end})")]
    InvalidSpan {
        /// First payload register.
        start: u64,
        /// One past the last payload register.
        end: u64,
    },

    /// Chunk position is not within `1..=block_total`.
    #[error("invalid block position {block_index}/{block_total}")]
    InvalidBlock {
        /// One-based chunk index.
        block_index: u64,
        /// Total chunks in the message.
        block_total: u64,
    },
}

/// Errors raised while slicing an outbound payload.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The message needs more chunks than the control register can count.
    #[error("message of {len} bytes needs {chunks} chunks (max {max_chunks})")]
    TooManyChunks {
        /// Payload length in bytes.
        len: usize,
        /// Chunks the payload would need.
        chunks: usize,
        /// Largest representable chunk count.
        max_chunks: usize,
    },

    /// Chunk size is zero, not word aligned, or larger than the payload window.
    #[error("invalid chunk size {size} (must be a non-zero multiple of {word} up to {max})")]
    InvalidChunkSize {
        /// Requested chunk size.
        size: usize,
        /// Word size.
        word: usize,
        /// Payload window size.
        max: usize,
    },
}
