//! Error types for Jarvis

use std::time::Duration;

use thiserror::Error;

/// Result type alias for Jarvis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone or audio device error
    #[error("capture error: {0}")]
    Capture(String),

    /// Malformed or failed speech recognition
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Language model request failed
    #[error("model error: {0}")]
    Model(String),

    /// Language model answered with a non-success status
    #[error("model returned {status}: {body}")]
    ModelStatus {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Speech synthesis or playback failed
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Speech playback exceeded its time budget
    #[error("synthesis timed out after {0:?}")]
    SynthesisTimeout(Duration),

    /// A worker queue was closed
    #[error("queue closed: {0}")]
    QueueClosed(&'static str),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
