use thiserror::Error;

/// Possible errors when reading or writing a [`GraphConfig`](crate::config::GraphConfig)
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An [IO](std::io) Error
    #[error("Could not read config: {0}")]
    Io(#[from] std::io::Error),
    /// A [RON](ron) Error
    #[error("Could not parse RON: {0}")]
    RonSpannedError(#[from] ron::error::SpannedError),
    #[error("Could not serialize RON: {0}")]
    RonError(#[from] ron::Error),
}
