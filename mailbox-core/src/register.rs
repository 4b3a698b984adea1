//! Shared register file.
//!
//! One endpoint's register window: [`REGISTER_COUNT`] 64-bit words that the
//! owner and its peer both access. Words are atomics so each load or store is
//! indivisible, the way a bus transaction on a real mailbox would be. There is
//! no lock anywhere; field ownership is enforced by [`RegisterFile::update`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::csr::{ControlRegister, RegisterUpdate};
use crate::error::CsrError;
use crate::layout::{REGISTER_COUNT, WORD_SIZE, Word};

/// Fixed-size array of shared register words.
pub struct RegisterFile {
    words: Box<[AtomicU64]>,
}

impl RegisterFile {
    /// Create a zeroed register file.
    pub fn new() -> Self {
        Self {
            words: (0..REGISTER_COUNT).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Number of registers.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false; a register file has a fixed, non-zero size.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Load a raw register value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the register file.
    pub fn load(&self, index: usize) -> u64 {
        self.words[index].load(Ordering::Acquire)
    }

    /// Store a raw register value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the register file.
    pub fn store(&self, index: usize, value: u64) {
        self.words[index].store(value, Ordering::Release);
    }

    /// Read a payload word.
    pub fn read_word(&self, index: usize) -> Word {
        self.load(index).to_le_bytes()
    }

    /// Write a payload word.
    pub fn write_word(&self, index: usize, word: Word) {
        self.store(index, u64::from_le_bytes(word));
    }

    /// Decode the control register at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CsrError`] if the register does not hold a valid `R`.
    pub fn read_register<R: ControlRegister>(&self, index: usize) -> Result<R, CsrError> {
        R::decode(self.load(index))
    }

    /// Overwrite the control register at `index` with a complete value.
    ///
    /// Only used at channel setup, before any peer activity.
    pub fn write_register<R: ControlRegister>(&self, index: usize, value: &R) {
        self.store(index, value.encode());
    }

    /// Apply a partial update to the control register at `index`.
    ///
    /// Re-applies the update on top of whatever the other field owner wrote
    /// in between, so fields outside `update` are never clobbered.
    ///
    /// # Errors
    ///
    /// Returns [`CsrError`] if the current value is malformed; the register is
    /// left untouched in that case.
    pub fn update<U: RegisterUpdate>(
        &self,
        index: usize,
        update: &U,
    ) -> Result<U::Register, CsrError> {
        let cell = &self.words[index];
        let mut current = cell.load(Ordering::Acquire);
        loop {
            let next = update.apply_raw(current)?;
            match cell.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return U::Register::decode(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Install `value` at `index` only if the register currently holds `expected`.
    ///
    /// Returns the value found on failure.
    pub fn compare_and_install(&self, index: usize, expected: u64, value: u64) -> Result<(), u64> {
        self.words[index]
            .compare_exchange(expected, value, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterFile")
            .field("registers", &self.words.len())
            .field("bytes", &(self.words.len() * WORD_SIZE))
            .finish()
    }
}
