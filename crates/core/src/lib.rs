#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod actor;
pub mod input;
pub mod session;
pub mod simulation;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types
pub use actor::{Actor, ActorId, Player, Slot, SlotError};
pub use input::{Direction, Input};
pub use session::{LocalSession, NetworkSession, Role, Session, SessionId, SessionState};
pub use simulation::{GameObject, GameState, Score, Simulation};

/// Wall-clock timestamp in milliseconds since the unix epoch.
pub type Millis = u64;

/// Current wall-clock time in unix milliseconds.
///
/// A clock set before 1970 reports zero rather than failing.
pub fn now_millis() -> Millis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Millis)
        .unwrap_or(0)
}
