use crate::session::Lifecycle;
use pong_sync_core::SessionId;
use pong_sync_net::TransportError;
use thiserror::Error;

/// Failure to start or keep a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session endpoint answered with a non-success status.
    #[error("{status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Plain-text response body.
        body: String,
    },

    /// The request never produced a response (or an unreadable one).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A configured base URL is unusable.
    #[error("invalid base url: {0}")]
    InvalidBase(String),

    /// A session is already being set up or is live.
    #[error("session busy ({0:?}); reset first")]
    Busy(Lifecycle),

    /// The transport channel could not be opened.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Why a session event was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StaleReconcile {
    /// There is no live session.
    #[error("no live session")]
    NoSession,

    /// The live session is local and takes no server updates.
    #[error("live session is local")]
    LocalSession,

    /// The event belongs to another session.
    #[error("event for session {event}, live session is {live}")]
    SessionMismatch {
        /// Session the event names.
        event: SessionId,
        /// Live session.
        live: SessionId,
    },

    /// The live session already closed.
    #[error("live session is closed")]
    SessionClosed,
}
