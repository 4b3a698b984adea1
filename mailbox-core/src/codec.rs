//! Slicing payloads into register words and chunks.
//!
//! Slot contents are always exactly [`WORD_SIZE`] bytes. A payload whose
//! length is not a multiple of the word size has its final word right-padded
//! with the pad byte; the receiver sees that padding. Removing it is up to
//! the upstream collaborator (see [`trim_padding`]).

use crate::error::CodecError;
use crate::layout::{MAX_CHUNK_BYTES, WORD_SIZE, Word};

/// Number of pad bytes the final word of a `len`-byte payload receives.
pub fn padding_for(len: usize) -> usize {
    match len % WORD_SIZE {
        0 => 0,
        rem => WORD_SIZE - rem,
    }
}

/// Number of words needed to carry `len` bytes.
pub fn words_for(len: usize) -> usize {
    len.div_ceil(WORD_SIZE)
}

/// Split `payload` into words, padding the last one with `pad`.
pub fn slice_words(payload: &[u8], pad: u8) -> Vec<Word> {
    payload
        .chunks(WORD_SIZE)
        .map(|piece| {
            let mut word = [pad; WORD_SIZE];
            word[..piece.len()].copy_from_slice(piece);
            word
        })
        .collect()
}

/// Concatenate words back into bytes, padding included.
pub fn join_words(words: &[Word]) -> Vec<u8> {
    words.iter().flatten().copied().collect()
}

/// Strip trailing pad bytes.
///
/// Also strips pad bytes that were genuinely part of the payload, which is
/// why the transport never calls this itself.
pub fn trim_padding(bytes: &[u8], pad: u8) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| *b != pad)
        .map_or(0, |last| last + 1);
    &bytes[..end]
}

/// Largest chunk count a chunk-control register can carry.
pub const MAX_CHUNKS: usize = u16::MAX as usize;

/// One chunk of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// One-based position.
    pub block_index: u16,
    /// Chunks in the message.
    pub block_total: u16,
    /// Chunk bytes, at most the configured chunk size.
    pub bytes: &'a [u8],
}

/// Split `payload` into ordered chunks of at most `max_chunk` bytes.
///
/// An empty payload yields no chunks.
///
/// # Errors
///
/// Fails if `max_chunk` is not a non-zero multiple of the word size within
/// the payload window, or if the payload needs more than [`MAX_CHUNKS`] chunks.
pub fn split_chunks(payload: &[u8], max_chunk: usize) -> Result<Vec<Chunk<'_>>, CodecError> {
    validate_chunk_size(max_chunk)?;
    let chunks = payload.len().div_ceil(max_chunk);
    if chunks > MAX_CHUNKS {
        return Err(CodecError::TooManyChunks {
            len: payload.len(),
            chunks,
            max_chunks: MAX_CHUNKS,
        });
    }
    let total = chunks as u16;
    Ok(payload
        .chunks(max_chunk)
        .zip(1..=total)
        .map(|(bytes, block_index)| Chunk {
            block_index,
            block_total: total,
            bytes,
        })
        .collect())
}

/// Check that `size` is usable as a chunk size.
///
/// # Errors
///
/// Returns [`CodecError::InvalidChunkSize`] when it is not.
pub fn validate_chunk_size(size: usize) -> Result<(), CodecError> {
    if size == 0 || size % WORD_SIZE != 0 || size > MAX_CHUNK_BYTES {
        return Err(CodecError::InvalidChunkSize {
            size,
            word: WORD_SIZE,
            max: MAX_CHUNK_BYTES,
        });
    }
    Ok(())
}
