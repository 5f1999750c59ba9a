//! Error types for the hub
//!
//! Defines protocol errors reported to a single connection, outbound
//! delivery errors, and fatal transport errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Protocol-level errors
///
/// Always local to the originating connection: no state mutation,
/// no broadcast. The display text is what the client receives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// Missing, blank or over-length field
    #[error("{0}")]
    Validation(&'static str),

    /// CHAT or LEAVE without an active session
    #[error("{0}")]
    NotInRoom(&'static str),

    /// Frame could not be decoded
    #[error("Invalid message format. Expected: {{\"username\":\"name\",\"content\":\"message\",\"room\":\"room\",\"type\":\"CHAT\"}}")]
    Malformed,
}

/// Message send errors
///
/// Occurs when a member's outbound queue cannot take a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The consumer is not keeping up
    #[error("Outbound queue full")]
    QueueFull,
}

/// Transport-level and internal errors
///
/// Fatal for the affected connection only: logged, and the connection is
/// treated as closed.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hub command channel closed
    #[error("Channel send error")]
    ChannelSend,

    /// Invalid configuration value
    #[error("Invalid config value for {key}: {value}")]
    Config { key: &'static str, value: String },
}
