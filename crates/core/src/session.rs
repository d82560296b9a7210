//! Session model.
//!
//! A session is the match the client currently takes part in. Local play
//! needs no transport; the three network roles share one server-side
//! session and differ in which inputs they own.

use crate::actor::{Actor, Player, Slot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Identifier used for local play.
    pub fn local() -> Self {
        Self("local".to_string())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How this client participates in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Both players on one keyboard, no network.
    Local,
    /// Authoritative simulator, owns slot 1.
    Host,
    /// Second active player, owns slot 2.
    Peer,
    /// Spectator, forwards no input.
    Observer,
}

impl Role {
    /// Connection type announced to the real-time endpoint.
    ///
    /// Local play never connects and has none.
    pub const fn connection_type(self) -> Option<&'static str> {
        match self {
            Role::Local => None,
            Role::Host => Some("host"),
            Role::Peer => Some("peer"),
            Role::Observer => Some("observer"),
        }
    }

    /// Keyboard slot driven by this client, if any.
    pub const fn keyboard_slot(self) -> Option<Slot> {
        match self {
            Role::Host => Some(Slot::One),
            Role::Peer => Some(Slot::Two),
            Role::Local | Role::Observer => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Local => "LOCAL",
            Role::Host => "HOST",
            Role::Peer => "PEER",
            Role::Observer => "OBSERVER",
        };
        f.write_str(name)
    }
}

/// Server-side lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    /// Waiting for players.
    Pending,
    /// Match in progress.
    Running,
    /// Match over; no further updates are expected.
    Closed,
}

/// Session played on a single keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSession {
    /// Session identifier (always [`SessionId::local`]).
    pub session_id: SessionId,
    /// Lifecycle state.
    pub state: SessionState,
}

impl LocalSession {
    /// A running local session.
    pub fn running() -> Self {
        Self {
            session_id: SessionId::local(),
            state: SessionState::Running,
        }
    }
}

/// Session shared with a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSession {
    /// Session identifier assigned by the server.
    pub session_id: SessionId,
    /// Local role; never taken from server updates.
    pub role: Role,
    /// Lifecycle state as last reported by the server.
    pub state: SessionState,
    /// Current roster; replaced wholesale on every update.
    pub players: Vec<Player>,
    /// This client's identity; fixed for the lifetime of the session.
    pub me: Actor,
}

impl NetworkSession {
    /// Player currently assigned to `slot`.
    pub fn player_in(&self, slot: Slot) -> Option<&Player> {
        self.players.iter().find(|p| p.slot == slot)
    }
}

/// The single live session value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// Local keyboard-only play.
    Local(LocalSession),
    /// Hosted, joined or watched network play.
    Network(NetworkSession),
}

impl Session {
    /// Session identifier.
    pub fn session_id(&self) -> &SessionId {
        match self {
            Session::Local(s) => &s.session_id,
            Session::Network(s) => &s.session_id,
        }
    }

    /// Role of this client.
    pub fn role(&self) -> Role {
        match self {
            Session::Local(_) => Role::Local,
            Session::Network(s) => s.role,
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> SessionState {
        match self {
            Session::Local(s) => s.state,
            Session::Network(s) => s.state,
        }
    }

    /// Network view of the session, if it has one.
    pub fn as_network(&self) -> Option<&NetworkSession> {
        match self {
            Session::Local(_) => None,
            Session::Network(s) => Some(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosted() -> NetworkSession {
        NetworkSession {
            session_id: "s1".into(),
            role: Role::Host,
            state: SessionState::Running,
            players: vec![Player::new("a", Slot::One), Player::new("b", Slot::Two)],
            me: Actor::new("a"),
        }
    }

    #[test]
    fn roster_lookup() {
        let session = hosted();
        assert_eq!(session.player_in(Slot::Two).map(|p| p.id.as_str()), Some("b"));
        assert_eq!(session.role.keyboard_slot(), Some(Slot::One));
    }

    #[test]
    fn observer_has_no_slot() {
        let mut session = hosted();
        session.me = Actor::new("watcher");
        session.role = Role::Observer;
        assert_eq!(session.role.keyboard_slot(), None);
        assert!(session.player_in(Slot::One).is_some());
    }

    #[test]
    fn connection_types() {
        assert_eq!(Role::Local.connection_type(), None);
        assert_eq!(Role::Host.connection_type(), Some("host"));
        assert_eq!(Role::Peer.connection_type(), Some("peer"));
        assert_eq!(Role::Observer.connection_type(), Some("observer"));
    }

    #[test]
    fn local_session_view() {
        let session = Session::Local(LocalSession::running());
        assert_eq!(session.role(), Role::Local);
        assert_eq!(session.session_id().as_str(), "local");
        assert!(session.as_network().is_none());
    }

    #[test]
    fn state_wire_names() {
        let json = serde_json::to_string(&SessionState::Pending).unwrap();
        assert_eq!(json, r#""PENDING""#);
    }
}
