//! Boundary to the deterministic game simulation.
//!
//! The simulation itself lives outside this workspace; the sync core only
//! feeds it the composed inputs once per frame and reads back object
//! positions (for host snapshots) and the score.

use crate::input::Input;
use serde::{Deserialize, Serialize};

/// Simulated object as reported by the simulation and the `move` topic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    /// Object identifier.
    pub id: u16,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Orientation, x component.
    pub orientation_x: f64,
    /// Orientation, y component.
    pub orientation_y: f64,
    /// Velocity, x component.
    pub vel_x: f64,
    /// Velocity, y component.
    pub vel_y: f64,
    /// Width for rectangles, radius for circles.
    pub shape_param_1: u16,
    /// Height for rectangles, zero for circles.
    pub shape_param_2: u16,
}

/// Points scored per slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Points for slot 1.
    pub player_1: u32,
    /// Points for slot 2.
    pub player_2: u32,
}

/// Game-level state read from the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current score.
    pub score: Score,
}

/// Opaque stepping simulation.
pub trait Simulation {
    /// Advance by `dt_seconds` with exactly the composed inputs.
    fn step(&mut self, inputs: &[Input], dt_seconds: f64);

    /// Current object positions.
    fn objects(&self) -> Vec<GameObject>;

    /// Current game state.
    fn state(&self) -> GameState;
}
