#![warn(missing_docs)]
//! Client façade: session lifecycle, transport, heartbeat and input
//! composition wired together behind one owner.

mod api;
mod compose;
mod config;
mod error;
mod heartbeat;
mod session;
mod snapshot;
#[cfg(test)]
mod testing;

pub use api::{HttpSessionApi, SessionApi, SessionGrant};
pub use compose::{compose, source_plan, InputComposer, InputSource, NetworkInputs};
pub use config::{ClientConfig, DEFAULT_CONFIG_PATH};
pub use error::{SessionError, StaleReconcile};
pub use heartbeat::{heartbeat_due, spawn_heartbeat, HeartbeatHandle, SnapshotClock};
pub use session::{ErrorObservation, Lifecycle, ReconcileOutcome, SessionManager, SessionStatus};
pub use snapshot::build_snapshot;

use pong_sync_core::{
    now_millis, GameObject, Input, NetworkSession, Session, SessionId, Simulation,
};
use pong_sync_input::KeyboardState;
use pong_sync_net::{
    ChannelEvent, ConnectTarget, Connected, ConnectionManager, Connector, EventMultiplexer,
    InputEvent, MoveEvent, OutboundMessage, SessionEvent, SessionSnapshot, StatusEvent,
    TopicReceiver, WebSocketConnector,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use winit::event::WindowEvent;
use winit::keyboard::KeyCode;

/// Relayed snapshots kept for [`SyncClient::next_tick`].
const TICK_BUFFER: usize = 64;

/// Which session to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartRequest {
    /// Both paddles on this keyboard.
    Local,
    /// Create a session and play slot 1.
    Host,
    /// Join a session and play slot 2.
    Join(SessionId),
    /// Watch a session.
    Watch(SessionId),
}

/// The client's own subscriptions to the multiplexer.
struct Feeds {
    input: TopicReceiver<InputEvent>,
    ticks: TopicReceiver<SessionSnapshot>,
    status: TopicReceiver<StatusEvent>,
}

impl Feeds {
    fn subscribe(mux: &mut EventMultiplexer) -> Self {
        Self {
            input: mux.subscribe_input(),
            ticks: mux.subscribe_ticks(),
            status: mux.subscribe_status(),
        }
    }
}

/// Single owner of everything a running client needs.
///
/// Inbound batches are processed in receipt order by [`pump`](Self::pump)
/// (called from [`frame`](Self::frame)); background tasks only talk to it
/// through channels.
pub struct SyncClient<C: Connector> {
    config: ClientConfig,
    sessions: SessionManager,
    connections: ConnectionManager<C>,
    inbound: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    mux: EventMultiplexer,
    feeds: Feeds,
    composer: InputComposer,
    keyboard: KeyboardState,
    heartbeat: Option<HeartbeatHandle>,
    snapshot_clock: SnapshotClock,
    latest_status: Option<StatusEvent>,
    ticks: VecDeque<SessionSnapshot>,
}

impl SyncClient<WebSocketConnector> {
    /// Client talking HTTP and WebSocket to the configured server.
    pub fn from_config(config: ClientConfig) -> Result<Self, SessionError> {
        let http_base = config
            .http_url()
            .map_err(|e| SessionError::InvalidBase(format!("{}: {e}", config.http_base)))?;
        let api = HttpSessionApi::new(http_base, config.request_timeout())?;
        Self::new(config, Arc::new(api), WebSocketConnector)
    }
}

impl<C: Connector> SyncClient<C> {
    /// Client with explicit session origin and socket connector.
    pub fn new(
        config: ClientConfig,
        api: Arc<dyn SessionApi>,
        connector: C,
    ) -> Result<Self, SessionError> {
        let config = config.validated();
        let ws_base = config
            .ws_url()
            .map_err(|e| SessionError::InvalidBase(format!("{}: {e}", config.ws_base)))?;
        let mut mux = EventMultiplexer::new();
        let feeds = Feeds::subscribe(&mut mux);

        Ok(Self {
            sessions: SessionManager::new(api, config.local_setup_delay()),
            connections: ConnectionManager::new(connector, ws_base, config.retry_policy()),
            inbound: None,
            mux,
            feeds,
            composer: InputComposer::new(),
            keyboard: KeyboardState::new(),
            heartbeat: None,
            snapshot_clock: SnapshotClock::new(),
            latest_status: None,
            ticks: VecDeque::new(),
            config,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a session. Only allowed while no session exists.
    ///
    /// Network sessions open their channel once the endpoint answers; if the
    /// channel cannot be opened the session is dropped again.
    pub async fn start(&mut self, request: StartRequest) -> Result<Session, SessionError> {
        let network = match &request {
            StartRequest::Local => {
                let session = self.sessions.go_local().await?;
                self.refresh_inputs();
                return Ok(session);
            }
            StartRequest::Host => self.sessions.create_host().await?,
            StartRequest::Join(id) => self.sessions.join_as_peer(id).await?,
            StartRequest::Watch(id) => self.sessions.watch_as_observer(id).await?,
        };

        self.open_channel(&network).await?;
        self.refresh_inputs();
        Ok(Session::Network(network))
    }

    async fn open_channel(&mut self, network: &NetworkSession) -> Result<(), SessionError> {
        let target = ConnectTarget::new(
            network.session_id.clone(),
            network.me.id.clone(),
            network.role,
        );
        match self.connections.connect(target).await {
            Ok(Connected::Opened(events)) => self.inbound = Some(events),
            Ok(Connected::AlreadyOpen) => {}
            Err(e) => {
                let err = SessionError::from(e);
                self.sessions.abort(&err);
                return Err(err);
            }
        }

        if let Some(sender) = self.connections.sender() {
            self.snapshot_clock.clear();
            self.heartbeat = Some(spawn_heartbeat(
                sender,
                network.session_id.clone(),
                network.me.id.clone(),
                self.config.heartbeat_interval(),
                &self.snapshot_clock,
            ));
        }
        Ok(())
    }

    /// Process every inbound notification received so far.
    ///
    /// Returns the number of events dispatched.
    pub fn pump(&mut self) -> usize {
        let mut dispatched = 0;
        while let Some(inbound) = self.inbound.as_mut() {
            let event = match inbound.try_recv() {
                Ok(event) => event,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.inbound = None;
                    break;
                }
            };
            match event {
                ChannelEvent::Batch(batch) => {
                    let summary = self.mux.dispatch(batch, &mut self.sessions);
                    dispatched += summary.total();
                    if summary.session > 0 && self.sessions.lifecycle() == Lifecycle::Closed {
                        self.stop_heartbeat();
                    }
                    self.drain_feeds(summary.session > 0);
                }
                ChannelEvent::Closed { reason } => self.on_channel_closed(reason),
            }
        }
        dispatched
    }

    fn drain_feeds(&mut self, session_changed: bool) {
        let me = self
            .sessions
            .session()
            .and_then(|s| s.as_network().map(|n| n.me.id.clone()));

        let mut changed = session_changed;
        while let Ok(events) = self.feeds.input.try_recv() {
            changed |= self.composer.record(&events, me.as_ref());
        }
        while let Ok(ticks) = self.feeds.ticks.try_recv() {
            self.ticks.extend(ticks);
            while self.ticks.len() > TICK_BUFFER {
                self.ticks.pop_front();
            }
        }
        while let Ok(status) = self.feeds.status.try_recv() {
            if let Some(latest) = status.into_iter().last() {
                self.latest_status = Some(latest);
            }
        }
        if changed {
            self.refresh_inputs();
        }
    }

    fn on_channel_closed(&mut self, reason: Option<String>) {
        match &reason {
            Some(reason) => warn!("Channel lost: {}", reason),
            None => info!("Channel closed by server"),
        }
        self.stop_heartbeat();
        self.connections.close();
        self.inbound = None;
        self.sessions.connection_lost(reason.as_deref());
        self.renew_multiplexer();
    }

    fn stop_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.cancel();
        }
    }

    /// End every topic subscription and start a fresh multiplexer.
    fn renew_multiplexer(&mut self) {
        self.mux.close();
        self.mux = EventMultiplexer::new();
        self.feeds = Feeds::subscribe(&mut self.mux);
    }

    /// Press a key. Returns `true` if the held set changed.
    pub fn press(&mut self, key: KeyCode) -> bool {
        let changed = self.keyboard.press(key);
        if changed {
            self.refresh_inputs();
        }
        changed
    }

    /// Release a key. Returns `true` if the held set changed.
    pub fn release(&mut self, key: KeyCode) -> bool {
        let changed = self.keyboard.release(key);
        if changed {
            self.refresh_inputs();
        }
        changed
    }

    /// Feed a window event to the keyboard.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        let changed = self.keyboard.handle_event(event);
        if changed {
            self.refresh_inputs();
        }
        changed
    }

    fn refresh_inputs(&mut self) {
        let session = self.sessions.session();
        self.composer.recompute(session.as_ref(), &self.keyboard);
    }

    /// Run one frame: process inbound events, step the simulation with the
    /// composed inputs and send this frame's snapshot.
    ///
    /// Returns the inputs the simulation was stepped with.
    pub fn frame(&mut self, sim: &mut dyn Simulation, dt: Duration) -> Vec<Input> {
        self.pump();
        let inputs = self.composer.current();
        sim.step(&inputs, dt.as_secs_f64());
        self.send_snapshot(|| sim.objects());
        inputs
    }

    /// Send a snapshot for the live session if its role sends one.
    ///
    /// Returns `true` if a snapshot was queued.
    pub fn send_snapshot(&mut self, objects: impl FnOnce() -> Vec<GameObject>) -> bool {
        if self.sessions.lifecycle() != Lifecycle::Running {
            return false;
        }
        let Some(session) = self.sessions.session() else {
            return false;
        };
        let Some(snapshot) = build_snapshot(&session, &self.keyboard, objects, now_millis())
        else {
            return false;
        };

        let sent = self
            .connections
            .channel()
            .is_some_and(|channel| channel.send(&OutboundMessage::Snapshot(snapshot)));
        if sent {
            self.snapshot_clock.record();
        }
        sent
    }

    /// Tear everything down and return to no session.
    ///
    /// Order: heartbeat, transport, subscribers, session. Subscriptions
    /// taken before the reset end; new ones can be taken afterwards.
    pub fn reset(&mut self) {
        debug!("Resetting client");
        self.stop_heartbeat();
        self.connections.close();
        self.inbound = None;
        self.mux.close();
        self.sessions.reset();

        self.renew_multiplexer();
        self.composer.reset();
        self.snapshot_clock.clear();
        self.latest_status = None;
        self.ticks.clear();
    }

    /// Live session.
    pub fn session(&self) -> Option<Session> {
        self.sessions.session()
    }

    /// Lifecycle of the live session.
    pub fn lifecycle(&self) -> Lifecycle {
        self.sessions.lifecycle()
    }

    /// Loading flag and last error.
    pub fn status(&self) -> SessionStatus {
        self.sessions.status()
    }

    /// Current composed inputs.
    pub fn inputs(&self) -> Vec<Input> {
        self.composer.current()
    }

    /// Keyboard state.
    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Whether a transport channel is open.
    pub fn is_connected(&self) -> bool {
        self.connections.is_open()
    }

    /// Whether the heartbeat is running.
    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Latest `status` event.
    pub fn latest_status(&self) -> Option<&StatusEvent> {
        self.latest_status.as_ref()
    }

    /// Newest relayed snapshot; older buffered ones are discarded.
    pub fn next_tick(&mut self) -> Option<SessionSnapshot> {
        let newest = self.ticks.pop_back();
        self.ticks.clear();
        newest
    }

    /// Observe the live session.
    pub fn subscribe_session(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe_session()
    }

    /// Observe loading/error status.
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.sessions.subscribe_status()
    }

    /// Observe the lifecycle.
    pub fn subscribe_lifecycle(&self) -> watch::Receiver<Lifecycle> {
        self.sessions.subscribe_lifecycle()
    }

    /// Observe the composed inputs.
    pub fn subscribe_inputs(&self) -> watch::Receiver<Vec<Input>> {
        self.composer.subscribe()
    }

    /// Subscribe to `session` events.
    pub fn subscribe_session_events(&mut self) -> TopicReceiver<SessionEvent> {
        self.mux.subscribe_session()
    }

    /// Subscribe to forwarded `input` events.
    pub fn subscribe_input_events(&mut self) -> TopicReceiver<InputEvent> {
        self.mux.subscribe_input()
    }

    /// Subscribe to `move` events.
    pub fn subscribe_moves(&mut self) -> TopicReceiver<MoveEvent> {
        self.mux.subscribe_moves()
    }

    /// Subscribe to relayed snapshots.
    pub fn subscribe_ticks(&mut self) -> TopicReceiver<SessionSnapshot> {
        self.mux.subscribe_ticks()
    }

    /// Subscribe to `status` events.
    pub fn subscribe_status_events(&mut self) -> TopicReceiver<StatusEvent> {
        self.mux.subscribe_status()
    }
}
