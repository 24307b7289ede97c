//! Error types for the chat server
//!
//! Defines application-level errors and sink send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Application-level errors
///
/// Everything except `Io` raised while binding or accepting is scoped to a
/// single session: it ends that session and nothing else.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (bind/accept failures are fatal to the server)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error, including over-long lines
    #[error("Line codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Registration line was not exactly `<name> <address>`
    #[error("Malformed registration line: {0:?}")]
    MalformedRegistration(String),

    /// The session's own outbound sink is closed
    #[error("Channel send error")]
    ChannelSend,
}

impl From<SendError> for AppError {
    fn from(_: SendError) -> Self {
        AppError::ChannelSend
    }
}

/// Sink send errors
///
/// Occurs when the receiving session's writer task has gone away.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
