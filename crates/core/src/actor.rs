//! Actors taking part in a session.
//!
//! Every participant is an [`Actor`]. The two active participants are also
//! [`Player`]s, each pinned to one of the two fixed [`Slot`]s of a match.
//! Observers are plain actors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned actor identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ActorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slot value outside the two fixed player positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid player slot {0} (expected 1 or 2)")]
pub struct SlotError(pub u8);

/// One of the two fixed player positions of a match.
///
/// Encoded on the wire as the number `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Slot {
    /// Left paddle, driven by W/S in local play.
    One = 1,
    /// Right paddle, driven by the arrow keys in local play.
    Two = 2,
}

impl Slot {
    /// Both slots in match order.
    pub const ALL: [Slot; 2] = [Slot::One, Slot::Two];

    /// Convert to the stable numeric representation.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert from the stable numeric representation.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }

    /// Identifier of the paddle object this slot controls.
    pub const fn paddle_object_id(self) -> u16 {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }
}

impl TryFrom<u8> for Slot {
    type Error = SlotError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(SlotError(value))
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.as_u8()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Any participant of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identifier.
    pub id: ActorId,
}

impl Actor {
    /// Create an actor from an identifier.
    pub fn new(id: impl Into<ActorId>) -> Self {
        Self { id: id.into() }
    }
}

/// An actor occupying one of the two player slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Actor identifier.
    pub id: ActorId,
    /// Slot this player occupies.
    pub slot: Slot,
}

impl Player {
    /// Create a player for the given slot.
    pub fn new(id: impl Into<ActorId>, slot: Slot) -> Self {
        Self {
            id: id.into(),
            slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_roundtrip_u8() {
        for slot in Slot::ALL {
            assert_eq!(Slot::from_u8(slot.as_u8()), Some(slot));
        }
        assert_eq!(Slot::from_u8(0), None);
        assert_eq!(Slot::from_u8(3), None);
    }

    #[test]
    fn slot_encodes_as_number() {
        let json = serde_json::to_string(&Player::new("a", Slot::Two)).unwrap();
        assert_eq!(json, r#"{"id":"a","slot":2}"#);
    }

    #[test]
    fn invalid_slot_is_rejected() {
        let result = serde_json::from_str::<Player>(r#"{"id":"a","slot":3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn paddles_are_distinct() {
        assert_ne!(Slot::One.paddle_object_id(), Slot::Two.paddle_object_id());
    }
}
