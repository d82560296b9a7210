//! Real-time transport: socket abstraction, connect target, readiness polling.

use crate::error::TransportError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use pong_sync_core::{ActorId, Role, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

/// Bidirectional text-frame socket.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Receive the next text frame. `None` means the peer closed the socket.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the socket.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports to a URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Transport produced on success.
    type Transport: Transport;

    /// Perform the handshake.
    async fn connect(&self, url: &Url) -> Result<Self::Transport, TransportError>;
}

/// Identity a channel is opened for; at most one channel exists per target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectTarget {
    /// Server session.
    pub session_id: SessionId,
    /// This client's actor.
    pub actor_id: ActorId,
    /// Local role, sent as the connection type.
    pub role: Role,
}

impl ConnectTarget {
    /// Create a target.
    pub fn new(session_id: SessionId, actor_id: ActorId, role: Role) -> Self {
        Self {
            session_id,
            actor_id,
            role,
        }
    }

    /// Channel URL: `{ws_base}/ws?session_id=..&actor_id=..&connection_type=..`.
    pub fn url(&self, ws_base: &Url) -> Result<Url, TransportError> {
        let connection_type = self
            .role
            .connection_type()
            .ok_or(TransportError::LocalRole)?;

        let mut url = ws_base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidBase(ws_base.to_string()))?
            .pop_if_empty()
            .push("ws");
        url.query_pairs_mut()
            .clear()
            .append_pair("session_id", self.session_id.as_str())
            .append_pair("actor_id", self.actor_id.as_str())
            .append_pair("connection_type", connection_type);
        Ok(url)
    }
}

/// Bounded readiness polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Readiness checks before giving up.
    pub attempts: u32,
    /// Delay after each failed check.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_millis(100))
    }
}

/// Check `ready` up to `policy.attempts` times, sleeping `policy.interval`
/// after each miss.
///
/// Returns the 1-based attempt that saw readiness.
pub async fn poll_until_ready(
    policy: RetryPolicy,
    mut ready: impl FnMut() -> bool,
) -> Result<u32, TransportError> {
    for attempt in 1..=policy.attempts {
        if ready() {
            return Ok(attempt);
        }
        debug!(attempt, "Transport not ready");
        tokio::time::sleep(policy.interval).await;
    }
    Err(TransportError::ConnectionTimeout {
        attempts: policy.attempts,
    })
}

/// Run the handshake in the background and poll it for completion.
///
/// A handshake that errors is reported as soon as it is observed; one that
/// never completes is aborted after the polling budget.
pub async fn establish<C: Connector>(
    connector: Arc<C>,
    url: Url,
    policy: RetryPolicy,
) -> Result<C::Transport, TransportError> {
    let handshake = tokio::spawn(async move { connector.connect(&url).await });

    if let Err(e) = poll_until_ready(policy, || handshake.is_finished()).await {
        warn!("Transport not ready, giving up: {}", e);
        handshake.abort();
        return Err(e);
    }

    match handshake.await {
        Ok(result) => result,
        Err(e) => Err(TransportError::Handshake(e.to_string())),
    }
}

/// Production connector over `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &Url) -> Result<WebSocketTransport, TransportError> {
        let (stream, response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        info!("WebSocket connected ({})", response.status());
        Ok(WebSocketTransport { stream })
    }
}

/// WebSocket-backed transport.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => warn!("Dropping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Close frame received");
                    return None;
                }
                // Control frames are answered by tungstenite itself.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(tungstenite::Error::ConnectionClosed) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
