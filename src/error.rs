//! Error types for the sales funnel bot.

use std::path::PathBuf;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl Error {
    /// Whether this error means the channel session dropped and should be
    /// reinitialized.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Self::Channel(ChannelError::SessionLost { .. }))
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// State store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel {name} lost its session: {reason}")]
    SessionLost { name: String, reason: String },

    #[error("Media file unavailable: {0}")]
    MediaUnavailable(PathBuf),
}

/// Content catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid catalog row {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_lost_is_detected_through_top_level_error() {
        let err: Error = ChannelError::SessionLost {
            name: "telegram".into(),
            reason: "401".into(),
        }
        .into();
        assert!(err.is_session_lost());

        let err: Error = ChannelError::SendFailed {
            name: "telegram".into(),
            reason: "timeout".into(),
        }
        .into();
        assert!(!err.is_session_lost());
    }

    #[test]
    fn catalog_error_mentions_row() {
        let err = CatalogError::InvalidEntry {
            index: 3,
            reason: "blank PROGRAMA".into(),
        };
        assert_eq!(err.to_string(), "Invalid catalog row 3: blank PROGRAMA");
    }
}
