//! # Mailbox
//!
//! Two endpoints exchanging messages through a pair of shared register
//! files, the way two processors talk through a hardware mailbox.
//!
//! ## Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              mailbox (this crate)                           │
//! │   Re-exports + JSON configuration files + demo binary       │
//! ├─────────────────────────────────────────────────────────────┤
//! │              mailbox-transport                              │
//! │  • Streaming and chunked endpoints                          │
//! │  • Notification, send gate, metrics                         │
//! │  • MessageSource / MessageSink seams                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │              mailbox-core                                   │
//! │  Register file, ring buffer, CSR codecs, reassembly         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use mailbox::prelude::*;
//!
//! let (a, b) = MailboxChannel::new(MailboxConfig::streaming())?;
//! assert_eq!(a.id().peer(), b.id());
//! # Ok::<(), TransportError>(())
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub use mailbox_core::*;
pub use mailbox_transport::*;

pub mod settings;

pub use settings::{SettingsError, load_config, parse_config};

/// Items needed to build and run a channel.
pub mod prelude {
    pub use crate::settings::load_config;
    pub use mailbox_core::codec::trim_padding;
    pub use mailbox_transport::{
        CsrLayout, Endpoint, EndpointTasks, IterSource, MailboxChannel, MailboxConfig,
        MessageSink, MessageSource, NotifyMode, PeerId, TaskProvider, TokioTaskProvider,
        TransferMode, TransportError, sink_fn, spawn_endpoint,
    };
}
