//! Transport channel: one socket per session identity.

use crate::codec::{decode_frame, encode_outbound};
use crate::error::TransportError;
use crate::protocol::{GameEvent, OutboundMessage};
use crate::transport::{establish, ConnectTarget, Connector, RetryPolicy, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

/// Upper bound on waiting for a graceful socket close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Notification on a channel's inbound stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Decoded events of one frame, in arrival order.
    Batch(Vec<GameEvent>),
    /// The server side closed or the socket failed. Always last.
    Closed {
        /// Failure description; `None` for an orderly remote close.
        reason: Option<String>,
    },
}

/// Cloneable fire-and-forget send handle.
#[derive(Debug, Clone)]
pub struct ChannelSender {
    cmd_tx: mpsc::UnboundedSender<String>,
    open: Arc<AtomicBool>,
}

impl ChannelSender {
    /// Whether frames are still accepted.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.cmd_tx.is_closed()
    }

    /// Queue a raw text frame. Returns `false` (and drops the frame) when
    /// the channel is not open.
    pub fn send_text(&self, text: String) -> bool {
        if !self.is_open() {
            trace!("Channel not open, dropping frame");
            return false;
        }
        self.cmd_tx.send(text).is_ok()
    }

    /// Encode and queue an outbound message. Never errors.
    pub fn send(&self, msg: &OutboundMessage) -> bool {
        if !self.is_open() {
            trace!(msg_type = ?msg.message_type(), "Channel not open, dropping message");
            return false;
        }
        match encode_outbound(msg) {
            Ok(text) => self.send_text(text),
            Err(e) => {
                warn!("Failed to encode outbound message: {}", e);
                false
            }
        }
    }
}

/// An open transport channel.
///
/// The socket is driven by a background task; inbound batches arrive on
/// the receiver returned alongside the channel. Dropping the channel closes
/// it.
#[derive(Debug)]
pub struct Channel {
    target: ConnectTarget,
    sender: ChannelSender,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Channel {
    /// Connect to `ws_base` for `target`, polling readiness per `policy`.
    pub async fn connect<C: Connector>(
        connector: Arc<C>,
        ws_base: &Url,
        target: ConnectTarget,
        policy: RetryPolicy,
    ) -> Result<(Channel, mpsc::UnboundedReceiver<ChannelEvent>), TransportError> {
        let url = target.url(ws_base)?;
        info!(
            session = %target.session_id,
            role = %target.role,
            "Connecting to {}",
            url
        );
        let transport = establish(connector, url, policy).await?;
        info!(session = %target.session_id, "Channel open");
        Ok(Self::open(transport, target))
    }

    /// Start driving an already connected transport.
    pub fn open<T: Transport>(
        transport: T,
        target: ConnectTarget,
    ) -> (Channel, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let open = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(io_loop(
            transport,
            cmd_rx,
            event_tx,
            shutdown_rx,
            Arc::clone(&open),
        ));

        let channel = Channel {
            target,
            sender: ChannelSender { cmd_tx, open },
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        };
        (channel, event_rx)
    }

    /// Identity this channel was opened for.
    pub fn target(&self) -> &ConnectTarget {
        &self.target
    }

    /// Send handle for other tasks.
    pub fn sender(&self) -> ChannelSender {
        self.sender.clone()
    }

    /// Queue an outbound message; see [`ChannelSender::send`].
    pub fn send(&self, msg: &OutboundMessage) -> bool {
        self.sender.send(msg)
    }

    /// Whether the channel still accepts frames.
    pub fn is_open(&self) -> bool {
        self.shutdown_tx.is_some() && self.sender.is_open()
    }

    /// Stop inbound delivery and close the socket. Idempotent.
    pub fn close(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            info!(session = %self.target.session_id, "Closing channel");
            self.sender.open.store(false, Ordering::Release);
            let _ = shutdown_tx.send(());
        }
    }

    /// Close and wait for the socket task to finish.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Channel task failed: {}", e);
            }
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn io_loop<T: Transport>(
    mut transport: T,
    mut cmd_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
    open: Arc<AtomicBool>,
) {
    debug!("Channel IO loop started");

    let reason = loop {
        tokio::select! {
            biased;

            // Client-initiated close: no Closed notification.
            _ = &mut shutdown_rx => {
                open.store(false, Ordering::Release);
                close_transport(&mut transport).await;
                debug!("Channel IO loop stopped");
                return;
            }

            cmd = cmd_rx.recv() => match cmd {
                Some(text) => {
                    trace!(len = text.len(), "Sending frame");
                    if let Err(e) = transport.send(text).await {
                        warn!("Send failed: {}", e);
                        break Some(e.to_string());
                    }
                }
                None => {
                    open.store(false, Ordering::Release);
                    close_transport(&mut transport).await;
                    return;
                }
            },

            incoming = transport.recv() => match incoming {
                Some(Ok(text)) => match decode_frame(&text) {
                    Ok(events) if events.is_empty() => {}
                    Ok(events) => {
                        debug!(count = events.len(), "Received batch");
                        if event_tx.send(ChannelEvent::Batch(events)).is_err() {
                            debug!("Inbound receiver dropped");
                        }
                    }
                    Err(e) => warn!("Dropping frame: {}", e),
                },
                Some(Err(e)) => {
                    warn!("Transport error: {}", e);
                    break Some(e.to_string());
                }
                None => {
                    info!("Transport closed by server");
                    break None;
                }
            },
        }
    };

    open.store(false, Ordering::Release);
    let _ = event_tx.send(ChannelEvent::Closed { reason });
    debug!("Channel IO loop stopped");
}

async fn close_transport<T: Transport>(transport: &mut T) {
    match tokio::time::timeout(CLOSE_TIMEOUT, transport.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Close failed: {}", e),
        Err(_) => debug!("Close timed out"),
    }
}

/// Result of [`ConnectionManager::connect`].
#[derive(Debug)]
pub enum Connected {
    /// A new channel was opened; its inbound stream.
    Opened(mpsc::UnboundedReceiver<ChannelEvent>),
    /// A channel for the same identity is already open.
    AlreadyOpen,
}

/// Owns the single live channel.
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    ws_base: Url,
    policy: RetryPolicy,
    current: Option<Channel>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager with no channel.
    pub fn new(connector: C, ws_base: Url, policy: RetryPolicy) -> Self {
        Self {
            connector: Arc::new(connector),
            ws_base,
            policy,
            current: None,
        }
    }

    /// Open a channel for `target`.
    ///
    /// Connecting again with the identity of the open channel is a no-op;
    /// any other identity replaces it.
    pub async fn connect(&mut self, target: ConnectTarget) -> Result<Connected, TransportError> {
        if let Some(channel) = &self.current {
            if channel.is_open() && channel.target() == &target {
                debug!(session = %target.session_id, "Channel already open");
                return Ok(Connected::AlreadyOpen);
            }
        }
        self.close();

        let (channel, events) =
            Channel::connect(Arc::clone(&self.connector), &self.ws_base, target, self.policy)
                .await?;
        self.current = Some(channel);
        Ok(Connected::Opened(events))
    }

    /// Live channel, if any.
    pub fn channel(&self) -> Option<&Channel> {
        self.current.as_ref()
    }

    /// Send handle of the live channel.
    pub fn sender(&self) -> Option<ChannelSender> {
        self.current.as_ref().map(Channel::sender)
    }

    /// Whether a channel is open.
    pub fn is_open(&self) -> bool {
        self.current.as_ref().is_some_and(Channel::is_open)
    }

    /// Close the live channel, if any.
    pub fn close(&mut self) {
        if let Some(mut channel) = self.current.take() {
            channel.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{memory_pair, ConnectBehavior, MemoryConnector};
    use crate::protocol::Heartbeat;
    use pong_sync_core::Role;

    fn target(session: &str) -> ConnectTarget {
        ConnectTarget::new(session.into(), "a".into(), Role::Host)
    }

    fn heartbeat() -> OutboundMessage {
        OutboundMessage::Heartbeat(Heartbeat {
            session_id: "s1".into(),
            player_id: "a".into(),
            ts: 1,
        })
    }

    const STATUS_FRAME: &str = r#"[{"topic":"status","event":"{\"session_id\":\"s1\",\"state\":{\"score\":{\"player_1\":1,\"player_2\":0}}}"}]"#;

    #[tokio::test]
    async fn inbound_frames_become_batches() {
        let (transport, peer) = memory_pair();
        let (_channel, mut events) = Channel::open(transport, target("s1"));

        peer.push_frame(STATUS_FRAME);
        match events.recv().await {
            Some(ChannelEvent::Batch(batch)) => assert_eq!(batch.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped_and_stream_continues() {
        let (transport, peer) = memory_pair();
        let (_channel, mut events) = Channel::open(transport, target("s1"));

        peer.push_frame("{not an array");
        peer.push_frame(STATUS_FRAME);
        assert!(matches!(events.recv().await, Some(ChannelEvent::Batch(_))));
    }

    #[tokio::test]
    async fn outbound_messages_reach_the_socket() {
        let (transport, mut peer) = memory_pair();
        let (channel, _events) = Channel::open(transport, target("s1"));

        assert!(channel.send(&heartbeat()));
        let text = peer.next_sent().await.unwrap();
        assert!(text.contains(r#""msg_type":"HeartBeat""#));
    }

    #[tokio::test]
    async fn remote_close_is_notified_once() {
        let (transport, mut peer) = memory_pair();
        let (channel, mut events) = Channel::open(transport, target("s1"));

        peer.hang_up();
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::Closed { reason: None })
        );
        assert_eq!(events.recv().await, None);
        assert!(!channel.is_open());
        assert!(!channel.send(&heartbeat()));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_silent() {
        let (transport, peer) = memory_pair();
        let (mut channel, mut events) = Channel::open(transport, target("s1"));
        let sender = channel.sender();

        channel.close();
        channel.close();
        assert!(!sender.send(&heartbeat()));

        channel.shutdown().await;
        assert!(peer.client_closed());
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn same_identity_connect_is_noop() {
        let (connector, mut peers) = MemoryConnector::new(ConnectBehavior::Immediate);
        let base = Url::parse("ws://test").unwrap();
        let mut manager = ConnectionManager::new(connector, base, RetryPolicy::default());

        assert!(matches!(
            manager.connect(target("s1")).await.unwrap(),
            Connected::Opened(_)
        ));
        assert!(matches!(
            manager.connect(target("s1")).await.unwrap(),
            Connected::AlreadyOpen
        ));

        let (url, _peer) = peers.recv().await.unwrap();
        assert_eq!(url.query(), Some("session_id=s1&actor_id=a&connection_type=host"));
        assert!(peers.try_recv().is_err());
    }

    #[tokio::test]
    async fn new_identity_replaces_channel() {
        let (connector, mut peers) = MemoryConnector::new(ConnectBehavior::Immediate);
        let base = Url::parse("ws://test").unwrap();
        let mut manager = ConnectionManager::new(connector, base, RetryPolicy::default());

        let _first = manager.connect(target("s1")).await.unwrap();
        let _second = manager.connect(target("s2")).await.unwrap();
        assert_eq!(
            manager.channel().map(|c| c.target().session_id.as_str()),
            Some("s2")
        );
        assert!(peers.try_recv().is_ok());
        assert!(peers.try_recv().is_ok());
        assert!(peers.try_recv().is_err());
    }
}
