//! In-process transport.
//!
//! Stands in for the WebSocket when there is no server: the other end of
//! every connection is handed out as a [`MemoryPeer`] that can push inbound
//! frames and read what the client sent.

use crate::error::TransportError;
use crate::transport::{Connector, Transport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// Client end of an in-process connection.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

/// Server end of an in-process connection.
#[derive(Debug)]
pub struct MemoryPeer {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

/// Create a connected transport/peer pair.
pub fn memory_pair() -> (MemoryTransport, MemoryPeer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    (
        MemoryTransport {
            inbound,
            outbound,
            closed: Arc::clone(&closed),
        },
        MemoryPeer {
            to_client: Some(to_client),
            from_client,
            closed,
        },
    )
}

impl MemoryPeer {
    /// Deliver one text frame to the client. Returns `false` once either
    /// side has gone away.
    pub fn push_frame(&self, text: impl Into<String>) -> bool {
        self.to_client
            .as_ref()
            .is_some_and(|tx| tx.send(text.into()).is_ok())
    }

    /// Next frame the client sent, waiting for one.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Next frame the client sent, if one is already queued.
    pub fn try_sent(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Drop the server side of the socket; the client sees a remote close.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// Whether the client closed its end.
    pub fn client_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.outbound.send(text).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        self.inbound.close();
        Ok(())
    }
}

/// How a [`MemoryConnector`] answers handshakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Connect at once.
    Immediate,
    /// Connect after a delay.
    Delay(Duration),
    /// Never complete the handshake.
    Hang,
    /// Fail the handshake with a message.
    Refuse(String),
}

/// Connector producing in-process transports.
///
/// Every successful connect hands its [`MemoryPeer`] and URL to the
/// receiver returned by [`MemoryConnector::new`].
#[derive(Debug)]
pub struct MemoryConnector {
    behavior: ConnectBehavior,
    peers: mpsc::UnboundedSender<(Url, MemoryPeer)>,
}

impl MemoryConnector {
    /// Create a connector and the receiver of its server ends.
    pub fn new(
        behavior: ConnectBehavior,
    ) -> (Self, mpsc::UnboundedReceiver<(Url, MemoryPeer)>) {
        let (peers, rx) = mpsc::unbounded_channel();
        (Self { behavior, peers }, rx)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn connect(&self, url: &Url) -> Result<MemoryTransport, TransportError> {
        match &self.behavior {
            ConnectBehavior::Immediate => {}
            ConnectBehavior::Delay(delay) => tokio::time::sleep(*delay).await,
            ConnectBehavior::Hang => std::future::pending::<()>().await,
            ConnectBehavior::Refuse(reason) => {
                return Err(TransportError::Handshake(reason.clone()))
            }
        }
        let (transport, peer) = memory_pair();
        // Without a listener the peer is dropped and the client sees a remote close.
        let _ = self.peers.send((url.clone(), peer));
        Ok(transport)
    }
}
