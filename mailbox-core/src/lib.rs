//! # mailbox-core
//!
//! Runtime-free building blocks of the mailbox transport.
//!
//! A mailbox is a pair of small register files, one per endpoint. A peer
//! writes payload words into the other side's file and describes them in a
//! control register; the owner reads them back out. This crate holds every
//! piece of that contract that does not need a scheduler:
//!
//! - [`RegisterFile`]: the shared word array, with lock-free partial updates
//! - [`RingBuffer`]: cursor arithmetic with one sacrificial slot
//! - [`csr`]: packed control register layouts and their partial updates
//! - [`codec`]: word slicing, padding and chunk splitting
//! - [`Reassembler`]: multi-chunk message reconstruction
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mailbox_core::{PAD_BYTE, RegisterFile, RingBuffer, codec};
//!
//! let ring = RingBuffer::new(Arc::new(RegisterFile::new()));
//! let words = codec::slice_words(b"hello", PAD_BYTE);
//! let tail = ring.write_span(0, &words);
//!
//! assert_eq!(ring.distance(0, tail), 1);
//! assert_eq!(codec::join_words(&ring.read_span(0, tail)), b"hello   ");
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod codec;
pub mod csr;
mod error;
mod layout;
mod reassembly;
mod register;
pub mod ring;

pub use csr::{
    ChunkControl, ChunkDescriptor, ControlRegister, EmbeddedCsr, EmbeddedCsrUpdate,
    RegisterUpdate, SplitCsr, SplitCsrUpdate,
};
pub use error::{CodecError, CsrError};
pub use layout::{
    CHUNK_CONTROL_INDEX, CHUNK_PAYLOAD_START, CHUNK_PAYLOAD_WORDS, CSR_INDEX, MAX_CHUNK_BYTES,
    MAX_LIVE_SLOTS, PAD_BYTE, REGISTER_COUNT, RING_CAPACITY, RING_CAPACITY_BYTES, WORD_SIZE, Word,
};
pub use reassembly::{Assembly, Discarded, Reassembler};
pub use register::RegisterFile;
pub use ring::RingBuffer;
