//! Abstract paddle inputs.

use crate::actor::Slot;
use serde::{Deserialize, Serialize};

/// Paddle movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Move the paddle up.
    Up,
    /// Move the paddle down.
    Down,
}

/// One held direction for one paddle.
///
/// Inputs are level-triggered: an input is present for as long as the
/// corresponding key (or remote report) is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Input {
    /// Direction being held.
    pub direction: Direction,
    /// Simulation object the input applies to.
    pub object_id: u16,
    /// Player slot that produced the input.
    pub slot: Slot,
}

impl Input {
    /// Input for the paddle owned by `slot`.
    pub fn paddle(direction: Direction, slot: Slot) -> Self {
        Self {
            direction,
            object_id: slot.paddle_object_id(),
            slot,
        }
    }
}
