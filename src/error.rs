//! FeedClaw error types

use thiserror::Error;

/// FeedClaw error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat channel error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Feed fetch or parse error
    #[error("Feed error: {0}")]
    Feed(String),

    /// Model service error
    #[error("Summarizer error: {0}")]
    Summarizer(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for FeedClaw operations
pub type Result<T> = std::result::Result<T, Error>;
