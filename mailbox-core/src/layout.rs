//! Register file geometry shared by both transfer modes.
//!
//! ```text
//! streaming:  [ ring slot 0 .. ring slot 62 | CSR (63) ]
//! chunked:    [ control (0) | payload 1 .. payload 63 ]
//! ```

/// Width of one register word in bytes.
pub const WORD_SIZE: usize = 8;

/// Total number of registers in one endpoint's register file.
pub const REGISTER_COUNT: usize = 64;

/// Ring capacity `C` in streaming mode (every register except the CSR).
pub const RING_CAPACITY: usize = REGISTER_COUNT - 1;

/// Most slots that can hold live data at once (one slot is sacrificed).
pub const MAX_LIVE_SLOTS: usize = RING_CAPACITY - 1;

/// Register index of the streaming CSR.
pub const CSR_INDEX: usize = REGISTER_COUNT - 1;

/// Register index of the chunk-control register in chunked mode.
pub const CHUNK_CONTROL_INDEX: usize = 0;

/// First payload register in chunked mode.
pub const CHUNK_PAYLOAD_START: usize = 1;

/// Payload registers available to one chunk.
pub const CHUNK_PAYLOAD_WORDS: usize = REGISTER_COUNT - CHUNK_PAYLOAD_START;

/// Largest chunk that fits the payload window (504 bytes).
pub const MAX_CHUNK_BYTES: usize = CHUNK_PAYLOAD_WORDS * WORD_SIZE;

/// Usable ring capacity in bytes (496 bytes).
pub const RING_CAPACITY_BYTES: usize = MAX_LIVE_SLOTS * WORD_SIZE;

/// Fill byte for the final partial word of a payload (ASCII space).
pub const PAD_BYTE: u8 = b' ';

/// One register word as raw bytes.
pub type Word = [u8; WORD_SIZE];
