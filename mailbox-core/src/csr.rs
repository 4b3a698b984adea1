//! Control register codecs.
//!
//! Every control register is one packed 64-bit word:
//!
//! ```text
//! streaming (A/B):  [tag:4 @60][reserved][enabled @17][notify @16][high:8 @8][low:8 @0]
//! chunk control:    [tag:4 @60][reserved][start:8 @40][end:8 @32][index:16 @16][total:16 @0]
//! ```
//!
//! - **Variant A** ([`EmbeddedCsr`], tag `0xA`): `head` in the high byte,
//!   `tail` in the low byte, both describing the owner's receive ring.
//! - **Variant B** ([`SplitCsr`], tag `0xB`): `rx_tail` in the high byte,
//!   `tx_head` in the low byte. Each field has exactly one writer.
//! - **Variant C** ([`ChunkControl`]): `0` is empty, tag `0xC` describes one
//!   in-flight chunk, tag `0xD` with an all-zero body is the ack sentinel.
//!
//! Two actors legitimately own disjoint fields of the same register, so
//! writers never store a whole register they did not build from the current
//! value. [`RegisterUpdate`] describes the fields to overwrite and leaves every
//! other field verbatim.

use crate::error::CsrError;
use crate::layout::{CHUNK_PAYLOAD_START, REGISTER_COUNT, RING_CAPACITY};

const TAG_SHIFT: u32 = 60;

const EMBEDDED_TAG: u8 = 0xA;
const SPLIT_TAG: u8 = 0xB;
const CHUNK_TAG: u8 = 0xC;
const ACK_TAG: u8 = 0xD;

const LOW_SHIFT: u32 = 0;
const HIGH_SHIFT: u32 = 8;
const NOTIFY_BIT: u64 = 1 << 16;
const ENABLED_BIT: u64 = 1 << 17;
const STREAMING_BODY: u64 = (1 << 18) - 1;

const TOTAL_SHIFT: u32 = 0;
const INDEX_SHIFT: u32 = 16;
const END_SHIFT: u32 = 32;
const START_SHIFT: u32 = 40;
const CHUNK_BODY: u64 = (1 << 48) - 1;

const BODY_MASK: u64 = (1 << TAG_SHIFT) - 1;

fn tag_of(raw: u64) -> u8 {
    (raw >> TAG_SHIFT) as u8
}

/// A register layout that can be packed into, and parsed from, one word.
pub trait ControlRegister: Sized + Copy {
    /// Layout name used in diagnostics.
    const LAYOUT: &'static str;

    /// Pack the fields into a register value.
    fn encode(&self) -> u64;

    /// Parse a register value.
    ///
    /// # Errors
    ///
    /// Returns [`CsrError`] when the tag, reserved bits or field ranges do
    /// not match this layout.
    fn decode(raw: u64) -> Result<Self, CsrError>;
}

/// A partial overwrite of a control register.
pub trait RegisterUpdate {
    /// Register layout this update applies to.
    type Register: ControlRegister;

    /// Overwrite the specified fields of `current`, keeping the rest.
    fn apply(&self, current: Self::Register) -> Self::Register;

    /// Apply the update to a raw register value.
    ///
    /// # Errors
    ///
    /// Fails if `raw` does not decode, so a corrupt register is never
    /// silently rewritten.
    fn apply_raw(&self, raw: u64) -> Result<u64, CsrError> {
        let current = Self::Register::decode(raw)?;
        Ok(self.apply(current).encode())
    }
}

/// Shared packing of the two streaming layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StreamingWord {
    notify: bool,
    enabled: bool,
    high: usize,
    low: usize,
}

impl StreamingWord {
    fn encode(&self, tag: u8) -> u64 {
        debug_assert!(self.high < RING_CAPACITY && self.low < RING_CAPACITY);
        let mut raw = (u64::from(tag) << TAG_SHIFT)
            | ((self.high as u64 & 0xff) << HIGH_SHIFT)
            | ((self.low as u64 & 0xff) << LOW_SHIFT);
        if self.notify {
            raw |= NOTIFY_BIT;
        }
        if self.enabled {
            raw |= ENABLED_BIT;
        }
        raw
    }

    fn decode(
        raw: u64,
        tag: u8,
        layout: &'static str,
        high_name: &'static str,
        low_name: &'static str,
    ) -> Result<Self, CsrError> {
        let found = tag_of(raw);
        if found != tag {
            return Err(CsrError::UnexpectedTag {
                raw,
                found,
                expected: layout,
            });
        }
        if raw & BODY_MASK & !STREAMING_BODY != 0 {
            return Err(CsrError::ReservedBits { raw });
        }
        let high = cursor((raw >> HIGH_SHIFT) & 0xff, high_name)?;
        let low = cursor((raw >> LOW_SHIFT) & 0xff, low_name)?;
        Ok(Self {
            notify: raw & NOTIFY_BIT != 0,
            enabled: raw & ENABLED_BIT != 0,
            high,
            low,
        })
    }
}

fn cursor(value: u64, field: &'static str) -> Result<usize, CsrError> {
    if value as usize >= RING_CAPACITY {
        return Err(CsrError::CursorOutOfRange {
            field,
            value,
            capacity: RING_CAPACITY,
        });
    }
    Ok(value as usize)
}

// =============================================================================
// Variant A
// =============================================================================

/// Interrupt-embedded CSR describing its owner's receive ring.
///
/// The producer advances `tail` and raises `notify`; the owner advances
/// `head`, clears `notify` and owns `enabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedCsr {
    /// Producer advanced the write frontier since the last clear.
    pub notify: bool,
    /// Owner accepts new data.
    pub enabled: bool,
    /// Next unread slot.
    pub head: usize,
    /// Next free slot.
    pub tail: usize,
}

impl EmbeddedCsr {
    /// Register value installed at channel setup: enabled, empty ring.
    pub const fn initial() -> Self {
        Self {
            notify: false,
            enabled: true,
            head: 0,
            tail: 0,
        }
    }
}

impl ControlRegister for EmbeddedCsr {
    const LAYOUT: &'static str = "embedded csr";

    fn encode(&self) -> u64 {
        StreamingWord {
            notify: self.notify,
            enabled: self.enabled,
            high: self.head,
            low: self.tail,
        }
        .encode(EMBEDDED_TAG)
    }

    fn decode(raw: u64) -> Result<Self, CsrError> {
        let word = StreamingWord::decode(raw, EMBEDDED_TAG, Self::LAYOUT, "head", "tail")?;
        Ok(Self {
            notify: word.notify,
            enabled: word.enabled,
            head: word.high,
            tail: word.low,
        })
    }
}

/// Fields of an [`EmbeddedCsr`] to overwrite; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddedCsrUpdate {
    /// New notify flag.
    pub notify: Option<bool>,
    /// New enable flag.
    pub enabled: Option<bool>,
    /// New head cursor.
    pub head: Option<usize>,
    /// New tail cursor.
    pub tail: Option<usize>,
}

impl EmbeddedCsrUpdate {
    /// Update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the notify flag.
    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Overwrite the enable flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Overwrite the head cursor.
    pub fn head(mut self, head: usize) -> Self {
        self.head = Some(head);
        self
    }

    /// Overwrite the tail cursor.
    pub fn tail(mut self, tail: usize) -> Self {
        self.tail = Some(tail);
        self
    }
}

impl RegisterUpdate for EmbeddedCsrUpdate {
    type Register = EmbeddedCsr;

    fn apply(&self, current: EmbeddedCsr) -> EmbeddedCsr {
        EmbeddedCsr {
            notify: self.notify.unwrap_or(current.notify),
            enabled: self.enabled.unwrap_or(current.enabled),
            head: self.head.unwrap_or(current.head),
            tail: self.tail.unwrap_or(current.tail),
        }
    }
}

// =============================================================================
// Variant B
// =============================================================================

/// Split-ownership CSR.
///
/// Lives in endpoint E's register file. `rx_tail` is the tail of E's receive
/// ring (written by the peer as producer); `tx_head` is the head of the
/// peer's receive ring (written by the peer as its consumer). E only clears
/// `notify` and owns `enabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitCsr {
    /// Producer advanced the write frontier since the last clear.
    pub notify: bool,
    /// Owner accepts new data.
    pub enabled: bool,
    /// Tail of the owner's receive ring.
    pub rx_tail: usize,
    /// Head of the peer's receive ring.
    pub tx_head: usize,
}

impl SplitCsr {
    /// Register value installed at channel setup: enabled, both rings empty.
    pub const fn initial() -> Self {
        Self {
            notify: false,
            enabled: true,
            rx_tail: 0,
            tx_head: 0,
        }
    }
}

impl ControlRegister for SplitCsr {
    const LAYOUT: &'static str = "split csr";

    fn encode(&self) -> u64 {
        StreamingWord {
            notify: self.notify,
            enabled: self.enabled,
            high: self.rx_tail,
            low: self.tx_head,
        }
        .encode(SPLIT_TAG)
    }

    fn decode(raw: u64) -> Result<Self, CsrError> {
        let word = StreamingWord::decode(raw, SPLIT_TAG, Self::LAYOUT, "rx_tail", "tx_head")?;
        Ok(Self {
            notify: word.notify,
            enabled: word.enabled,
            rx_tail: word.high,
            tx_head: word.low,
        })
    }
}

/// Fields of a [`SplitCsr`] to overwrite; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitCsrUpdate {
    /// New notify flag.
    pub notify: Option<bool>,
    /// New enable flag.
    pub enabled: Option<bool>,
    /// New receive tail.
    pub rx_tail: Option<usize>,
    /// New transmit head.
    pub tx_head: Option<usize>,
}

impl SplitCsrUpdate {
    /// Update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the notify flag.
    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Overwrite the enable flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Overwrite the receive tail.
    pub fn rx_tail(mut self, rx_tail: usize) -> Self {
        self.rx_tail = Some(rx_tail);
        self
    }

    /// Overwrite the transmit head.
    pub fn tx_head(mut self, tx_head: usize) -> Self {
        self.tx_head = Some(tx_head);
        self
    }
}

impl RegisterUpdate for SplitCsrUpdate {
    type Register = SplitCsr;

    fn apply(&self, current: SplitCsr) -> SplitCsr {
        SplitCsr {
            notify: self.notify.unwrap_or(current.notify),
            enabled: self.enabled.unwrap_or(current.enabled),
            rx_tail: self.rx_tail.unwrap_or(current.rx_tail),
            tx_head: self.tx_head.unwrap_or(current.tx_head),
        }
    }
}

// =============================================================================
// Variant C
// =============================================================================

/// Span and position of one chunk of a larger message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// First payload register of the chunk.
    pub start: usize,
    /// One past the last payload register.
    pub end: usize,
    /// One-based position of this chunk.
    pub block_index: u16,
    /// Number of chunks in the message.
    pub block_total: u16,
}

impl ChunkDescriptor {
    /// Number of payload words covered by the span.
    pub fn words(&self) -> usize {
        self.end - self.start
    }

    /// Whether this chunk completes its message.
    pub fn is_last(&self) -> bool {
        self.block_index == self.block_total
    }
}

/// Chunk-control register of the synchronous transfer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkControl {
    /// Nothing pending; a writer may install a new value.
    Empty,
    /// A chunk is waiting in the payload registers.
    Data(ChunkDescriptor),
    /// The previous chunk was consumed; the sender may proceed.
    Ack,
}

impl ControlRegister for ChunkControl {
    const LAYOUT: &'static str = "chunk control";

    fn encode(&self) -> u64 {
        match self {
            ChunkControl::Empty => 0,
            ChunkControl::Ack => u64::from(ACK_TAG) << TAG_SHIFT,
            ChunkControl::Data(chunk) => {
                (u64::from(CHUNK_TAG) << TAG_SHIFT)
                    | ((chunk.start as u64 & 0xff) << START_SHIFT)
                    | ((chunk.end as u64 & 0xff) << END_SHIFT)
                    | (u64::from(chunk.block_index) << INDEX_SHIFT)
                    | (u64::from(chunk.block_total) << TOTAL_SHIFT)
            }
        }
    }

    fn decode(raw: u64) -> Result<Self, CsrError> {
        if raw == 0 {
            return Ok(ChunkControl::Empty);
        }
        match tag_of(raw) {
            ACK_TAG if raw & BODY_MASK == 0 => Ok(ChunkControl::Ack),
            ACK_TAG => Err(CsrError::ReservedBits { raw }),
            CHUNK_TAG => {
                if raw & BODY_MASK & !CHUNK_BODY != 0 {
                    return Err(CsrError::ReservedBits { raw });
                }
                let start = (raw >> START_SHIFT) & 0xff;
                let end = (raw >> END_SHIFT) & 0xff;
                if start < CHUNK_PAYLOAD_START as u64 || end <= start || end > REGISTER_COUNT as u64
                {
                    return Err(CsrError::InvalidSpan { start, end });
                }
                let block_index = (raw >> INDEX_SHIFT) & 0xffff;
                let block_total = (raw >> TOTAL_SHIFT) & 0xffff;
                if block_index == 0 || block_index > block_total {
                    return Err(CsrError::InvalidBlock {
                        block_index,
                        block_total,
                    });
                }
                Ok(ChunkControl::Data(ChunkDescriptor {
                    start: start as usize,
                    end: end as usize,
                    block_index: block_index as u16,
                    block_total: block_total as u16,
                }))
            }
            found => Err(CsrError::UnexpectedTag {
                raw,
                found,
                expected: Self::LAYOUT,
            }),
        }
    }
}
