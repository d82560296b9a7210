#![warn(missing_docs)]
//! Keyboard input source for both paddles.

use pong_sync_core::{Direction, Input, Slot};
use tracing::trace;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Fixed key table: W/S drive slot 1, the arrow keys drive slot 2.
pub const KEY_BINDINGS: [(KeyCode, Direction, Slot); 4] = [
    (KeyCode::KeyW, Direction::Up, Slot::One),
    (KeyCode::KeyS, Direction::Down, Slot::One),
    (KeyCode::ArrowUp, Direction::Up, Slot::Two),
    (KeyCode::ArrowDown, Direction::Down, Slot::Two),
];

/// Map a key to its paddle input, if it is bound.
pub fn input_for_key(key: KeyCode) -> Option<Input> {
    KEY_BINDINGS
        .iter()
        .find(|(bound, _, _)| *bound == key)
        .map(|&(_, direction, slot)| Input::paddle(direction, slot))
}

/// Set of currently held keys.
///
/// Keys are kept in press order so the derived inputs are stable between
/// frames; the order carries no meaning.
#[derive(Debug, Default)]
pub struct KeyboardState {
    held: Vec<KeyCode>,
}

impl KeyboardState {
    /// Create an empty keyboard state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press. Returns `true` if the held set changed.
    pub fn press(&mut self, key: KeyCode) -> bool {
        if self.held.contains(&key) {
            return false;
        }
        trace!(?key, "key pressed");
        self.held.push(key);
        true
    }

    /// Record a key release. Returns `true` if the held set changed.
    pub fn release(&mut self, key: KeyCode) -> bool {
        let before = self.held.len();
        self.held.retain(|k| *k != key);
        let changed = self.held.len() != before;
        if changed {
            trace!(?key, "key released");
        }
        changed
    }

    /// Process a window event. Returns `true` if the held set changed.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(keycode),
                        state,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed => self.press(*keycode),
                ElementState::Released => self.release(*keycode),
            },
            // Keys held while the window loses focus never see a release.
            WindowEvent::Focused(false) => self.clear(),
            _ => false,
        }
    }

    /// Release every key. Returns `true` if anything was held.
    pub fn clear(&mut self) -> bool {
        let changed = !self.held.is_empty();
        self.held.clear();
        changed
    }

    /// Check if a key is currently held.
    pub fn key_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Inputs for every bound key currently held; unbound keys are dropped.
    pub fn inputs(&self) -> Vec<Input> {
        self.held.iter().filter_map(|k| input_for_key(*k)).collect()
    }

    /// Inputs for one slot only.
    pub fn inputs_for(&self, slot: Slot) -> Vec<Input> {
        self.inputs().into_iter().filter(|i| i.slot == slot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keyboard_has_no_inputs() {
        let keyboard = KeyboardState::new();
        assert!(keyboard.inputs().is_empty());
    }

    #[test]
    fn duplicate_press_is_ignored() {
        let mut keyboard = KeyboardState::new();
        assert!(keyboard.press(KeyCode::KeyW));
        assert!(!keyboard.press(KeyCode::KeyW));
        assert_eq!(keyboard.inputs().len(), 1);
    }

    #[test]
    fn release_of_unheld_key_is_noop() {
        let mut keyboard = KeyboardState::new();
        assert!(!keyboard.release(KeyCode::KeyS));
        keyboard.press(KeyCode::KeyS);
        assert!(keyboard.release(KeyCode::KeyS));
        assert!(!keyboard.key_held(KeyCode::KeyS));
    }

    #[test]
    fn unmapped_keys_are_dropped() {
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::KeyA);
        keyboard.press(KeyCode::Space);
        assert!(keyboard.key_held(KeyCode::KeyA));
        assert!(keyboard.inputs().is_empty());
    }

    #[test]
    fn key_table() {
        let mut keyboard = KeyboardState::new();
        for key in [
            KeyCode::KeyW,
            KeyCode::KeyS,
            KeyCode::ArrowUp,
            KeyCode::ArrowDown,
        ] {
            keyboard.press(key);
        }
        assert_eq!(
            keyboard.inputs_for(Slot::One),
            vec![
                Input::paddle(Direction::Up, Slot::One),
                Input::paddle(Direction::Down, Slot::One),
            ]
        );
        assert_eq!(
            keyboard.inputs_for(Slot::Two),
            vec![
                Input::paddle(Direction::Up, Slot::Two),
                Input::paddle(Direction::Down, Slot::Two),
            ]
        );
    }

    #[test]
    fn slot_two_uses_second_paddle() {
        let input = input_for_key(KeyCode::ArrowUp).expect("bound");
        assert_eq!(input.object_id, 1);
        assert_eq!(input.slot, Slot::Two);
    }

    #[test]
    fn clear_releases_everything() {
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::KeyW);
        assert!(keyboard.clear());
        assert!(!keyboard.clear());
        assert!(keyboard.inputs().is_empty());
    }
}
