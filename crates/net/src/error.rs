//! Error types for the wire codec and the transport channel.

use crate::protocol::MessageType;
use thiserror::Error;

/// Failure to encode or decode a wire document.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The outer frame is not a JSON array of envelopes.
    #[error("malformed frame: {0}")]
    Frame(#[source] serde_json::Error),

    /// The inner `event` document of one envelope failed to decode.
    #[error("malformed {topic} event: {source}")]
    Event {
        /// Topic of the envelope.
        topic: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The decoded event broke a protocol limit.
    #[error("invalid {topic} event: {reason}")]
    Invalid {
        /// Topic of the envelope.
        topic: String,
        /// Violated limit.
        reason: &'static str,
    },

    /// The inner `payload` of an outbound message failed to decode.
    #[error("malformed {msg_type:?} payload: {source}")]
    Payload {
        /// Declared message type.
        msg_type: MessageType,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failure to establish or use the real-time transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint never became ready within the polling budget.
    #[error("connection not ready after {attempts} attempts")]
    ConnectionTimeout {
        /// Readiness checks performed.
        attempts: u32,
    },

    /// The handshake failed outright.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Socket-level failure after the connection was up.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The configured base URL cannot carry the channel path.
    #[error("invalid websocket base url: {0}")]
    InvalidBase(String),

    /// Local sessions never connect.
    #[error("local sessions have no transport")]
    LocalRole,

    /// The channel is already closed.
    #[error("channel closed")]
    Closed,
}
