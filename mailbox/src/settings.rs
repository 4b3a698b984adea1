//! Loading a [`MailboxConfig`] from a JSON file.
//!
//! Every field is optional; missing ones keep their defaults.
//!
//! ```json
//! {
//!   "transfer": { "kind": "chunked", "max_chunk_bytes": 256 },
//!   "notify": { "kind": "interrupt" },
//!   "send_interval": { "secs": 0, "nanos": 5000000 }
//! }
//! ```

use std::path::{Path, PathBuf};

use mailbox_transport::{ConfigError, MailboxConfig};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not a valid configuration document.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but describes an unusable channel.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Parse and validate a JSON configuration document.
pub fn parse_config(json: &str) -> Result<MailboxConfig, SettingsError> {
    let config: MailboxConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate a JSON configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<MailboxConfig, SettingsError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded mailbox configuration");
    parse_config(&json)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mailbox_transport::{CsrLayout, NotifyMode, TransferMode};

    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(parse_config("{}").expect("parse"), MailboxConfig::default());
    }

    #[test]
    fn test_full_document() {
        let config = parse_config(
            r#"{
                "transfer": { "kind": "streaming", "layout": "split" },
                "notify": { "kind": "poll", "interval": { "secs": 0, "nanos": 1000000 } },
                "pad_byte": 0,
                "send_interval": { "secs": 1, "nanos": 0 }
            }"#,
        )
        .expect("parse");

        assert_eq!(
            config.transfer,
            TransferMode::Streaming {
                layout: CsrLayout::Split
            }
        );
        assert_eq!(
            config.notify,
            NotifyMode::Poll {
                interval: Duration::from_millis(1)
            }
        );
        assert_eq!(config.pad_byte, 0);
        assert_eq!(config.send_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_document_rejected() {
        let err = parse_config(r#"{ "transfer": { "kind": "chunked", "max_chunk_bytes": 9 } }"#)
            .expect_err("bad chunk size");
        assert!(matches!(err, SettingsError::Invalid(_)));

        let err = parse_config(r#"{ "transfer": "sideways" }"#).expect_err("bad mode");
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/mailbox.json").expect_err("missing");
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
