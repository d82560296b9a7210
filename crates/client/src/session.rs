//! Session lifecycle manager.
//!
//! Owns the single live [`Session`] and publishes it, the loading/error
//! status and the lifecycle through `watch` channels. Only this type ever
//! replaces the session value.

use crate::api::{SessionApi, SessionGrant};
use crate::error::{SessionError, StaleReconcile};
use pong_sync_core::{
    now_millis, LocalSession, Millis, NetworkSession, Role, Session, SessionId, SessionState,
};
use pong_sync_net::{SessionEvent, SessionReconciler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Client-side lifecycle of the live session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// No session.
    #[default]
    Uninitialized,
    /// Waiting for the session endpoint.
    Pending,
    /// Session live.
    Running,
    /// The server closed the session.
    Closed,
}

/// A published failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorObservation {
    /// Rendered error, e.g. `503: overloaded`.
    pub value: String,
    /// When it happened.
    pub at: Millis,
}

/// Loading flag and last error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    /// A session request is in flight.
    pub loading: bool,
    /// Last failure, cleared when a new request starts.
    pub error: Option<ErrorObservation>,
}

/// Result of applying one session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The live session was replaced.
    Applied,
    /// The event was not applicable.
    Ignored(StaleReconcile),
}

/// Owner of the live session.
pub struct SessionManager {
    api: Arc<dyn SessionApi>,
    local_setup_delay: Duration,
    session: watch::Sender<Option<Session>>,
    status: watch::Sender<SessionStatus>,
    lifecycle: watch::Sender<Lifecycle>,
}

impl SessionManager {
    /// Manager with no session that originates network sessions through `api`.
    pub fn new(api: Arc<dyn SessionApi>, local_setup_delay: Duration) -> Self {
        let (session, _) = watch::channel(None);
        let (status, _) = watch::channel(SessionStatus::default());
        let (lifecycle, _) = watch::channel(Lifecycle::Uninitialized);
        Self {
            api,
            local_setup_delay,
            session,
            status,
            lifecycle,
        }
    }

    /// Observe the live session.
    pub fn subscribe_session(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    /// Observe loading/error status.
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Observe the lifecycle.
    pub fn subscribe_lifecycle(&self) -> watch::Receiver<Lifecycle> {
        self.lifecycle.subscribe()
    }

    /// Snapshot of the live session.
    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Current lifecycle.
    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Start a keyboard-only session after the setup delay.
    pub async fn go_local(&mut self) -> Result<Session, SessionError> {
        self.ensure_idle()?;
        self.status.send_replace(SessionStatus {
            loading: true,
            error: None,
        });

        tokio::time::sleep(self.local_setup_delay).await;

        let session = Session::Local(LocalSession::running());
        self.session.send_replace(Some(session.clone()));
        self.lifecycle.send_replace(Lifecycle::Running);
        self.status.send_replace(SessionStatus::default());
        info!("Local session running");
        Ok(session)
    }

    /// Create a session and host it.
    pub async fn create_host(&mut self) -> Result<NetworkSession, SessionError> {
        self.start_network(Role::Host, None).await
    }

    /// Join `session_id` as the second player.
    pub async fn join_as_peer(
        &mut self,
        session_id: &SessionId,
    ) -> Result<NetworkSession, SessionError> {
        self.start_network(Role::Peer, Some(session_id)).await
    }

    /// Watch `session_id`.
    pub async fn watch_as_observer(
        &mut self,
        session_id: &SessionId,
    ) -> Result<NetworkSession, SessionError> {
        self.start_network(Role::Observer, Some(session_id)).await
    }

    async fn start_network(
        &mut self,
        role: Role,
        session_id: Option<&SessionId>,
    ) -> Result<NetworkSession, SessionError> {
        self.ensure_idle()?;
        let previous = self.lifecycle();
        self.lifecycle.send_replace(Lifecycle::Pending);
        self.status.send_replace(SessionStatus {
            loading: true,
            error: None,
        });

        let api = Arc::clone(&self.api);
        let result = match (role, session_id) {
            (Role::Peer, Some(id)) => api.join_session(id).await,
            (Role::Observer, Some(id)) => api.watch_session(id).await,
            _ => api.create_session().await,
        };

        let grant = match result {
            Ok(grant) => grant,
            Err(err) => {
                warn!(%role, "Session request failed: {}", err);
                self.lifecycle.send_replace(previous);
                self.publish_error(&err);
                return Err(err);
            }
        };

        let SessionGrant { actor, session } = grant;
        let network = NetworkSession {
            session_id: session.session_id,
            role,
            state: session.state,
            players: session.players,
            me: actor,
        };
        info!(
            session = %network.session_id,
            %role,
            players = network.players.len(),
            "Network session running"
        );
        self.session
            .send_replace(Some(Session::Network(network.clone())));
        self.lifecycle.send_replace(Lifecycle::Running);
        self.status.send_replace(SessionStatus::default());
        Ok(network)
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        match self.lifecycle() {
            Lifecycle::Uninitialized => Ok(()),
            other => Err(SessionError::Busy(other)),
        }
    }

    fn publish_error(&self, err: &SessionError) {
        self.status.send_replace(SessionStatus {
            loading: false,
            error: Some(ErrorObservation {
                value: err.to_string(),
                at: now_millis(),
            }),
        });
    }

    /// Apply an authoritative session update.
    ///
    /// Roster and state are replaced; identity and role are kept.
    pub fn reconcile(&mut self, event: &SessionEvent) -> ReconcileOutcome {
        let next = {
            let current = self.session.borrow();
            let Some(current) = current.as_ref() else {
                return self.ignore(StaleReconcile::NoSession);
            };
            let Some(network) = current.as_network() else {
                return self.ignore(StaleReconcile::LocalSession);
            };
            if network.state == SessionState::Closed {
                return self.ignore(StaleReconcile::SessionClosed);
            }
            if network.session_id != event.session.session_id {
                return self.ignore(StaleReconcile::SessionMismatch {
                    event: event.session.session_id.clone(),
                    live: network.session_id.clone(),
                });
            }
            NetworkSession {
                state: event.session.state,
                players: event.session.players.clone(),
                ..network.clone()
            }
        };

        debug!(
            session = %next.session_id,
            event_type = %event.event_type,
            state = ?next.state,
            "Reconciled session"
        );
        let closed = next.state == SessionState::Closed;
        self.session.send_replace(Some(Session::Network(next)));
        if closed {
            info!(reason = %event.reason, "Session closed by server");
            self.lifecycle.send_replace(Lifecycle::Closed);
        }
        ReconcileOutcome::Applied
    }

    fn ignore(&self, reason: StaleReconcile) -> ReconcileOutcome {
        warn!("Ignoring session event: {}", reason);
        ReconcileOutcome::Ignored(reason)
    }

    /// Record that the transport channel of the live session went away.
    ///
    /// The session itself stays until [`reset`](Self::reset); only the
    /// error observation changes.
    pub fn connection_lost(&mut self, reason: Option<&str>) {
        let value = match reason {
            Some(reason) => format!("connection lost: {reason}"),
            None => "connection closed by server".to_string(),
        };
        warn!(session = ?self.session().map(|s| s.session_id().clone()), "{}", value);
        self.status.send_replace(SessionStatus {
            loading: false,
            error: Some(ErrorObservation {
                value,
                at: now_millis(),
            }),
        });
    }

    /// Drop a session whose setup failed after the endpoint answered.
    pub fn abort(&mut self, err: &SessionError) {
        warn!("Session setup aborted: {}", err);
        self.session.send_replace(None);
        self.lifecycle.send_replace(Lifecycle::Uninitialized);
        self.publish_error(err);
    }

    /// Return to [`Lifecycle::Uninitialized`]. Heartbeat and channel must
    /// already be torn down.
    pub fn reset(&mut self) {
        debug!(lifecycle = ?self.lifecycle(), "Resetting session");
        self.session.send_replace(None);
        self.lifecycle.send_replace(Lifecycle::Uninitialized);
        self.status.send_replace(SessionStatus::default());
    }
}

impl SessionReconciler for SessionManager {
    /// Events are applied in order, so the last applicable one wins.
    fn reconcile_batch(&mut self, events: &[SessionEvent]) {
        for event in events {
            self.reconcile(event);
        }
    }
}
