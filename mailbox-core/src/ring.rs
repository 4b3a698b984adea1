//! Circular slot array with one sacrificial slot.
//!
//! `head == tail` means empty, `(tail + 1) % C == head` means full, so at most
//! `C - 1` slots ever hold live data and the slot at `tail` is always free.
//! The ring does no locking and keeps no cursors of its own: cursors live in
//! the control register, and callers follow its single-writer discipline.

use std::sync::Arc;

use crate::layout::{RING_CAPACITY, Word};
use crate::register::RegisterFile;

/// Number of filled slots between `head` and `tail`.
pub fn distance(head: usize, tail: usize, capacity: usize) -> usize {
    (tail + capacity - head) % capacity
}

/// Number of slots a producer may still fill.
pub fn free_slots(head: usize, tail: usize, capacity: usize) -> usize {
    capacity - distance(head, tail, capacity) - 1
}

/// Advance a cursor by `count` slots.
pub fn advance(cursor: usize, count: usize, capacity: usize) -> usize {
    (cursor + count) % capacity
}

/// Ring view over the first `capacity` registers of a register file.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    registers: Arc<RegisterFile>,
    capacity: usize,
}

impl RingBuffer {
    /// Ring over the streaming layout (`C = 63`).
    pub fn new(registers: Arc<RegisterFile>) -> Self {
        Self::with_capacity(registers, RING_CAPACITY)
    }

    /// Ring over the first `capacity` registers.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is below 2 or larger than the register file.
    pub fn with_capacity(registers: Arc<RegisterFile>, capacity: usize) -> Self {
        assert!(capacity >= 2, "ring needs at least one usable slot");
        assert!(capacity <= registers.len(), "ring larger than register file");
        Self {
            registers,
            capacity,
        }
    }

    /// Ring capacity `C`, including the sacrificial slot.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Backing register file.
    pub fn registers(&self) -> &Arc<RegisterFile> {
        &self.registers
    }

    /// Write one slot.
    pub fn write(&self, slot: usize, word: Word) {
        debug_assert!(slot < self.capacity);
        self.registers.write_word(slot, word);
    }

    /// Read one slot.
    pub fn read(&self, slot: usize) -> Word {
        debug_assert!(slot < self.capacity);
        self.registers.read_word(slot)
    }

    /// Filled slots between `head` and `tail`.
    pub fn distance(&self, head: usize, tail: usize) -> usize {
        distance(head, tail, self.capacity)
    }

    /// Free slots between `tail` and `head`.
    pub fn free_slots(&self, head: usize, tail: usize) -> usize {
        free_slots(head, tail, self.capacity)
    }

    /// Whether no slot holds live data.
    pub fn is_empty(&self, head: usize, tail: usize) -> bool {
        head == tail
    }

    /// Whether a producer must wait for the consumer.
    pub fn is_full(&self, head: usize, tail: usize) -> bool {
        advance(tail, 1, self.capacity) == head
    }

    /// Write `words` starting at `tail`, wrapping at the end of the ring.
    ///
    /// Returns the new tail. The caller must have checked that `words` fits
    /// in [`free_slots`](Self::free_slots).
    pub fn write_span(&self, tail: usize, words: &[Word]) -> usize {
        let mut cursor = tail;
        for word in words {
            self.write(cursor, *word);
            cursor = advance(cursor, 1, self.capacity);
        }
        cursor
    }

    /// Read every slot in `[head, tail)`, wrapping at the end of the ring.
    pub fn read_span(&self, head: usize, tail: usize) -> Vec<Word> {
        let mut words = Vec::with_capacity(self.distance(head, tail));
        let mut cursor = head;
        while cursor != tail {
            words.push(self.read(cursor));
            cursor = advance(cursor, 1, self.capacity);
        }
        words
    }
}
