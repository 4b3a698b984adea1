//! Configuration structures for mailbox channels.

use std::time::Duration;

use mailbox_core::{MAX_CHUNK_BYTES, PAD_BYTE, codec};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where the streaming cursors live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsrLayout {
    /// Both cursors of a ring sit in the ring owner's register.
    #[default]
    Embedded,
    /// Each register carries the owner's receive tail and the peer's
    /// transmit head.
    Split,
}

/// How payload crosses the mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferMode {
    /// Continuous byte stream through a 63-slot ring.
    Streaming {
        /// Cursor placement.
        layout: CsrLayout,
    },
    /// Chunk-at-a-time transfer with an acknowledgement per chunk.
    Chunked {
        /// Largest chunk written in one go, a multiple of the word size.
        max_chunk_bytes: usize,
    },
}

impl TransferMode {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Streaming { .. } => "streaming",
            Self::Chunked { .. } => "chunked",
        }
    }
}

impl Default for TransferMode {
    fn default() -> Self {
        Self::Streaming {
            layout: CsrLayout::Embedded,
        }
    }
}

/// How a consumer learns that data is waiting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifyMode {
    /// Wait on the interrupt-style signal raised by the producer.
    #[default]
    Interrupt,
    /// Check the notify bit of the own CSR every `interval`.
    ///
    /// `Duration::ZERO` yields to the scheduler between checks.
    Poll {
        /// Delay between checks.
        interval: Duration,
    },
}

/// Configuration of one mailbox channel, shared by both endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Transfer mode.
    pub transfer: TransferMode,

    /// Notification mode.
    pub notify: NotifyMode,

    /// Byte used to fill the final word of an unaligned payload.
    pub pad_byte: u8,

    /// Pause between consecutive outbound messages.
    ///
    /// Set to `Duration::ZERO` to send as fast as the peer drains.
    pub send_interval: Duration,

    /// Pause between checks while the peer ring is full.
    ///
    /// `Duration::ZERO` only yields to the scheduler.
    pub full_poll_interval: Duration,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            transfer: TransferMode::default(),
            notify: NotifyMode::Interrupt,
            pad_byte: PAD_BYTE,
            send_interval: Duration::ZERO,
            full_poll_interval: Duration::ZERO,
        }
    }
}

impl MailboxConfig {
    /// Streaming transfer with cursors embedded in the ring owner's CSR.
    pub fn streaming() -> Self {
        Self::default()
    }

    /// Streaming transfer with split cursor registers.
    pub fn split_streaming() -> Self {
        Self {
            transfer: TransferMode::Streaming {
                layout: CsrLayout::Split,
            },
            ..Self::default()
        }
    }

    /// Chunked transfer using the whole payload window per chunk.
    pub fn chunked() -> Self {
        Self {
            transfer: TransferMode::Chunked {
                max_chunk_bytes: MAX_CHUNK_BYTES,
            },
            ..Self::default()
        }
    }

    /// Streaming transfer where consumers poll their notify bit.
    pub fn polling(interval: Duration) -> Self {
        Self {
            notify: NotifyMode::Poll { interval },
            ..Self::default()
        }
    }

    /// Set the pad byte.
    pub fn with_pad_byte(mut self, pad_byte: u8) -> Self {
        self.pad_byte = pad_byte;
        self
    }

    /// Pace outbound messages.
    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.send_interval = interval;
        self
    }

    /// Pause between checks while the peer ring is full.
    pub fn with_full_poll_interval(mut self, interval: Duration) -> Self {
        self.full_poll_interval = interval;
        self
    }

    /// Set the notification mode.
    pub fn with_notify(mut self, notify: NotifyMode) -> Self {
        self.notify = notify;
        self
    }

    /// Check the configuration before any register is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.transfer {
            TransferMode::Streaming { .. } => Ok(()),
            TransferMode::Chunked { max_chunk_bytes } => {
                codec::validate_chunk_size(max_chunk_bytes)?;
                if matches!(self.notify, NotifyMode::Poll { .. }) {
                    return Err(ConfigError::PollingRequiresStreaming);
                }
                Ok(())
            }
        }
    }
}
