//! Rebuilding multi-chunk messages on the receive side.
//!
//! At most one message is in flight per receive direction. Fragments are
//! appended while `block_index < block_total`; the chunk with
//! `block_index == block_total` completes the message, which is returned
//! whole and the accumulator reset.
//!
//! A chunk that does not follow the accumulator (wrong total, skipped or
//! repeated index) abandons the partial message. If that chunk is itself the
//! first of a message it starts a fresh accumulation, otherwise it is dropped
//! as well and the reassembler waits for the next first chunk.

/// Result of feeding one chunk to the [`Reassembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    /// More chunks are expected.
    Pending,
    /// The message is complete.
    Complete(Vec<u8>),
}

/// What was thrown away while handling an out-of-sequence chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discarded {
    /// Fragments of the abandoned partial message.
    pub fragments: usize,
    /// Whether the offending chunk was dropped too.
    pub chunk_dropped: bool,
}

/// Per-direction accumulator of message fragments.
#[derive(Debug, Default)]
pub struct Reassembler {
    fragments: Vec<Vec<u8>>,
    block_total: u16,
    discarded: Discarded,
}

impl Reassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a message is partially assembled.
    pub fn in_progress(&self) -> bool {
        !self.fragments.is_empty()
    }

    /// Number of fragments collected for the current message.
    pub fn fragments(&self) -> usize {
        self.fragments.len()
    }

    /// Index the next chunk must carry.
    pub fn expected_index(&self) -> u16 {
        self.fragments.len() as u16 + 1
    }

    /// Take the record of what the last [`push`](Self::push) discarded.
    pub fn take_discarded(&mut self) -> Option<Discarded> {
        let discarded = std::mem::take(&mut self.discarded);
        (discarded != Discarded::default()).then_some(discarded)
    }

    /// Feed one chunk.
    ///
    /// `block_index` is one-based and never exceeds `block_total`.
    pub fn push(&mut self, block_index: u16, block_total: u16, bytes: Vec<u8>) -> Assembly {
        debug_assert!(block_index >= 1 && block_index <= block_total);
        self.discarded = Discarded::default();

        let follows = if self.fragments.is_empty() {
            block_index == 1
        } else {
            block_total == self.block_total && block_index == self.expected_index()
        };

        if !follows {
            let abandoned = self.fragments.len();
            self.reset();
            let restart = block_index == 1;
            self.discarded = Discarded {
                fragments: abandoned,
                chunk_dropped: !restart,
            };
            tracing::warn!(
                block_index,
                block_total,
                abandoned,
                restart,
                "out-of-sequence chunk, abandoning partial message"
            );
            if !restart {
                return Assembly::Pending;
            }
        }

        self.block_total = block_total;
        self.fragments.push(bytes);

        if block_index == block_total {
            let message = self.fragments.concat();
            self.reset();
            Assembly::Complete(message)
        } else {
            Assembly::Pending
        }
    }

    /// Drop any partial message.
    pub fn reset(&mut self) {
        self.fragments.clear();
        self.block_total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_message() {
        let mut r = Reassembler::new();
        assert_eq!(r.push(1, 1, b"dog".to_vec()), Assembly::Complete(b"dog".to_vec()));
        assert!(!r.in_progress());
        assert_eq!(r.take_discarded(), None);
    }

    #[test]
    fn test_delivers_only_on_last_chunk() {
        let mut r = Reassembler::new();
        assert_eq!(r.push(1, 3, b"aa".to_vec()), Assembly::Pending);
        assert_eq!(r.push(2, 3, b"bb".to_vec()), Assembly::Pending);
        assert_eq!(r.fragments(), 2);
        assert_eq!(
            r.push(3, 3, b"cc".to_vec()),
            Assembly::Complete(b"aabbcc".to_vec())
        );
        assert!(!r.in_progress());
        assert_eq!(r.expected_index(), 1);
    }

    #[test]
    fn test_restart_abandons_partial_message() {
        let mut r = Reassembler::new();
        r.push(1, 3, b"old".to_vec());
        r.push(2, 3, b"old".to_vec());

        assert_eq!(r.push(1, 2, b"new".to_vec()), Assembly::Pending);
        assert_eq!(
            r.take_discarded(),
            Some(Discarded {
                fragments: 2,
                chunk_dropped: false
            })
        );
        assert_eq!(
            r.push(2, 2, b"er".to_vec()),
            Assembly::Complete(b"newer".to_vec())
        );
    }

    #[test]
    fn test_skipped_index_drops_everything() {
        let mut r = Reassembler::new();
        r.push(1, 4, b"a".to_vec());

        assert_eq!(r.push(3, 4, b"c".to_vec()), Assembly::Pending);
        assert!(!r.in_progress());
        assert_eq!(
            r.take_discarded(),
            Some(Discarded {
                fragments: 1,
                chunk_dropped: true
            })
        );

        // Tail of the broken message is dropped until a new first chunk.
        assert_eq!(r.push(4, 4, b"d".to_vec()), Assembly::Pending);
        assert_eq!(r.push(1, 1, b"ok".to_vec()), Assembly::Complete(b"ok".to_vec()));
    }

    #[test]
    fn test_duplicate_chunk_abandons() {
        let mut r = Reassembler::new();
        r.push(1, 2, b"x".to_vec());
        assert_eq!(r.push(1, 2, b"x".to_vec()), Assembly::Pending);
        assert_eq!(
            r.take_discarded(),
            Some(Discarded {
                fragments: 1,
                chunk_dropped: false
            })
        );
        assert_eq!(r.push(2, 2, b"y".to_vec()), Assembly::Complete(b"xy".to_vec()));
    }
}
