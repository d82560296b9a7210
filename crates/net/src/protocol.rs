//! Protocol message definitions for client-server communication.
//!
//! Everything on the wire is JSON. Both directions nest a second,
//! independently encoded JSON document inside the outer frame: inbound
//! envelopes carry `{topic, event: "<json>"}` and outbound messages carry
//! `{msg_type, payload: "<json>"}`. See [`crate::codec`] for the two-stage
//! encoding.

use pong_sync_core::{
    Actor, ActorId, GameObject, GameState, Input, Millis, Player, SessionId, SessionState,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version of the message shapes in this module.
pub const PROTOCOL_VERSION: u16 = 1;

/// Maximum inputs accepted in one input event (both directions, both slots).
pub const MAX_INPUTS_PER_EVENT: usize = 4;

/// Maximum roster size.
pub const MAX_PLAYERS: usize = 2;

/// Maximum simulated objects in one snapshot.
pub const MAX_SNAPSHOT_OBJECTS: usize = 64;

/// Topic an inbound event was published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Session lifecycle and roster updates.
    Session,
    /// Inputs forwarded from another player.
    Input,
    /// Object positions published by the host.
    Move,
    /// Full snapshots relayed by the server.
    Tick,
    /// Game status (score) updates.
    Status,
}

impl Topic {
    /// All topics in dispatch order.
    pub const ALL: [Topic; 5] = [
        Topic::Session,
        Topic::Input,
        Topic::Move,
        Topic::Tick,
        Topic::Status,
    ];

    /// Wire name of the topic.
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::Session => "session",
            Topic::Input => "input",
            Topic::Move => "move",
            Topic::Tick => "tick",
            Topic::Status => "status",
        }
    }

    /// Parse a wire topic name. Unknown topics yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Topic::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outer inbound envelope; `event` is itself a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnvelope {
    /// Topic name.
    pub topic: String,
    /// Encoded event payload.
    pub event: String,
}

/// Session fields as published by the server.
///
/// Carries no role or identity: those are local and never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// Session identifier.
    pub session_id: SessionId,
    /// Server-side lifecycle state.
    pub state: SessionState,
    /// Full roster.
    #[serde(default)]
    pub players: Vec<Player>,
}

impl SessionPayload {
    /// Verify roster limits.
    pub fn verify(&self) -> Result<(), &'static str> {
        if self.players.len() > MAX_PLAYERS {
            return Err("Roster has more than two players");
        }
        if let [a, b] = self.players.as_slice() {
            if a.slot == b.slot {
                return Err("Two players share one slot");
            }
        }
        Ok(())
    }
}

/// Session lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Actor whose action caused the event.
    pub actor: Actor,
    /// Server event kind (e.g. `created`, `joined`, `closed`).
    pub event_type: String,
    /// Human-readable reason, empty when not given.
    #[serde(default)]
    pub reason: String,
    /// Authoritative session state after the event.
    pub session: SessionPayload,
}

/// Inputs reported by one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Session the inputs belong to.
    pub session_id: SessionId,
    /// Inputs held at `ts`.
    #[serde(default)]
    pub inputs: Vec<Input>,
    /// Reporting player.
    pub player_id: ActorId,
    /// Slot of the reporting player, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_slot: Option<pong_sync_core::Slot>,
    /// Sender timestamp.
    pub ts: Millis,
}

impl InputEvent {
    /// Verify input limits.
    pub fn verify(&self) -> Result<(), &'static str> {
        if self.inputs.len() > MAX_INPUTS_PER_EVENT {
            return Err("Too many inputs in one event");
        }
        Ok(())
    }
}

/// Position update for one simulated object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveEvent {
    /// Session the object belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Host timestamp of the position.
    #[serde(default)]
    pub ts: Millis,
    /// Object state.
    #[serde(flatten)]
    pub object: GameObject,
}

/// Game status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Session the status belongs to.
    pub session_id: SessionId,
    /// Current game state.
    pub state: GameState,
}

/// Snapshot of a player's view, sent by the client and relayed on `tick`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session the snapshot belongs to.
    pub session_id: SessionId,
    /// Inputs of the sending player.
    #[serde(default)]
    pub inputs: Vec<Input>,
    /// Simulated objects; only ever present in host snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<GameObject>>,
    /// Sending player.
    pub player_id: ActorId,
    /// Sender timestamp.
    pub ts: Millis,
}

impl SessionSnapshot {
    /// Verify snapshot limits.
    pub fn verify(&self) -> Result<(), &'static str> {
        if self.inputs.len() > MAX_INPUTS_PER_EVENT {
            return Err("Too many inputs in snapshot");
        }
        if self
            .objects
            .as_ref()
            .is_some_and(|o| o.len() > MAX_SNAPSHOT_OBJECTS)
        {
            return Err("Too many objects in snapshot");
        }
        Ok(())
    }
}

/// Decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Session lifecycle / roster update.
    Session(SessionEvent),
    /// Remote player inputs.
    Input(InputEvent),
    /// Host-published object position.
    Move(MoveEvent),
    /// Relayed snapshot.
    Tick(SessionSnapshot),
    /// Game status.
    Status(StatusEvent),
}

impl GameEvent {
    /// Topic this event travels on.
    pub fn topic(&self) -> Topic {
        match self {
            GameEvent::Session(_) => Topic::Session,
            GameEvent::Input(_) => Topic::Input,
            GameEvent::Move(_) => Topic::Move,
            GameEvent::Tick(_) => Topic::Tick,
            GameEvent::Status(_) => Topic::Status,
        }
    }

    /// Verify message limits and validity.
    ///
    /// Called on every decoded event; remote data is never trusted.
    pub fn verify(&self) -> Result<(), &'static str> {
        match self {
            GameEvent::Session(event) => event.session.verify(),
            GameEvent::Input(event) => event.verify(),
            GameEvent::Tick(snapshot) => snapshot.verify(),
            GameEvent::Move(_) | GameEvent::Status(_) => Ok(()),
        }
    }
}

/// Liveness message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Session being kept alive.
    pub session_id: SessionId,
    /// Sending actor.
    pub player_id: ActorId,
    /// Send time.
    pub ts: Millis,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Current inputs (and objects, for the host).
    Snapshot(SessionSnapshot),
    /// Keep-alive when no snapshot went out recently.
    Heartbeat(Heartbeat),
}

impl OutboundMessage {
    /// Wire message type.
    pub fn message_type(&self) -> MessageType {
        match self {
            OutboundMessage::Snapshot(_) => MessageType::SessionSnapshot,
            OutboundMessage::Heartbeat(_) => MessageType::HeartBeat,
        }
    }
}

/// Outbound message discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// Payload is a [`SessionSnapshot`].
    SessionSnapshot,
    /// Payload is a [`Heartbeat`].
    HeartBeat,
}

/// Outer outbound frame; `payload` is itself a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Payload kind.
    pub msg_type: MessageType,
    /// Encoded payload.
    pub payload: String,
}
