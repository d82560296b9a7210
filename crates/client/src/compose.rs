//! Role-conditional input composition.
//!
//! Each paddle slot is fed from exactly one source: the local keyboard or
//! the latest inputs the server forwarded for the player in that slot. The
//! composed list (slot 1 first) is the only input the simulation sees.

use pong_sync_core::{ActorId, Input, Role, Session, Slot};
use pong_sync_input::KeyboardState;
use pong_sync_net::InputEvent;
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::trace;

/// Where a slot's inputs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Local keyboard, filtered to the slot.
    Keyboard,
    /// Latest network inputs of the player in the slot.
    Network,
}

/// Source for each slot, in slot order.
pub const fn source_plan(role: Role) -> [(Slot, InputSource); 2] {
    use InputSource::{Keyboard, Network};
    match role {
        Role::Local => [(Slot::One, Keyboard), (Slot::Two, Keyboard)],
        Role::Host => [(Slot::One, Keyboard), (Slot::Two, Network)],
        Role::Peer => [(Slot::One, Network), (Slot::Two, Keyboard)],
        Role::Observer => [(Slot::One, Network), (Slot::Two, Network)],
    }
}

/// Latest forwarded inputs per remote player.
#[derive(Debug, Default, Clone)]
pub struct NetworkInputs {
    latest: HashMap<ActorId, Vec<Input>>,
}

impl NetworkInputs {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an input event; events authored by `me` are ignored.
    ///
    /// Returns `true` if the stored inputs changed.
    pub fn apply(&mut self, event: &InputEvent, me: Option<&ActorId>) -> bool {
        if me == Some(&event.player_id) {
            trace!("Ignoring echo of own inputs");
            return false;
        }
        match self.latest.get(&event.player_id) {
            Some(current) if *current == event.inputs => false,
            _ => {
                self.latest
                    .insert(event.player_id.clone(), event.inputs.clone());
                true
            }
        }
    }

    /// Latest inputs of `player`; empty if none arrived yet.
    pub fn inputs_of(&self, player: &ActorId) -> &[Input] {
        self.latest.get(player).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Forget all history.
    pub fn clear(&mut self) {
        self.latest.clear();
    }
}

/// Compose the simulation inputs for the live session.
///
/// No session means no inputs.
pub fn compose(
    session: Option<&Session>,
    keyboard: &KeyboardState,
    network: &NetworkInputs,
) -> Vec<Input> {
    let Some(session) = session else {
        return Vec::new();
    };

    let mut inputs = Vec::new();
    for (slot, source) in source_plan(session.role()) {
        match source {
            InputSource::Keyboard => inputs.extend(keyboard.inputs_for(slot)),
            InputSource::Network => {
                let player = session
                    .as_network()
                    .and_then(|network_session| network_session.player_in(slot));
                if let Some(player) = player {
                    inputs.extend_from_slice(network.inputs_of(&player.id));
                }
            }
        }
    }
    inputs
}

/// Keeps the composed inputs current and publishes them.
#[derive(Debug)]
pub struct InputComposer {
    network: NetworkInputs,
    tx: watch::Sender<Vec<Input>>,
}

impl Default for InputComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl InputComposer {
    /// Composer with no history and an empty published list.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            network: NetworkInputs::new(),
            tx,
        }
    }

    /// Observe the composed inputs.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Input>> {
        self.tx.subscribe()
    }

    /// Last published inputs.
    pub fn current(&self) -> Vec<Input> {
        self.tx.borrow().clone()
    }

    /// Record forwarded input events in arrival order.
    ///
    /// Returns `true` if any stored inputs changed.
    pub fn record(&mut self, events: &[InputEvent], me: Option<&ActorId>) -> bool {
        events
            .iter()
            .fold(false, |changed, event| self.network.apply(event, me) || changed)
    }

    /// Recompute and publish. Subscribers are only woken on change.
    pub fn recompute(&self, session: Option<&Session>, keyboard: &KeyboardState) -> Vec<Input> {
        let inputs = compose(session, keyboard, &self.network);
        self.tx.send_if_modified(|current| {
            if *current == inputs {
                return false;
            }
            current.clone_from(&inputs);
            true
        });
        inputs
    }

    /// Drop all history and publish an empty list.
    pub fn reset(&mut self) {
        self.network.clear();
        self.tx.send_replace(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pong_sync_core::{
        Actor, Direction, LocalSession, NetworkSession, Player, SessionState,
    };
    use winit::keyboard::KeyCode;

    fn network_session(role: Role, me: &str) -> Session {
        Session::Network(NetworkSession {
            session_id: "s1".into(),
            role,
            state: SessionState::Running,
            players: vec![Player::new("a", Slot::One), Player::new("b", Slot::Two)],
            me: Actor::new(me),
        })
    }

    fn input_event(player: &str, inputs: Vec<Input>) -> InputEvent {
        InputEvent {
            session_id: "s1".into(),
            inputs,
            player_id: player.into(),
            player_slot: None,
            ts: 0,
        }
    }

    fn up(slot: Slot) -> Input {
        Input::paddle(Direction::Up, slot)
    }

    fn down(slot: Slot) -> Input {
        Input::paddle(Direction::Down, slot)
    }

    #[test]
    fn host_combines_keyboard_and_peer() {
        let session = network_session(Role::Host, "a");
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::KeyW);
        // Host's own arrow keys do not drive slot 2.
        keyboard.press(KeyCode::ArrowUp);

        let mut network = NetworkInputs::new();
        network.apply(&input_event("b", vec![down(Slot::Two)]), Some(&"a".into()));

        assert_eq!(
            compose(Some(&session), &keyboard, &network),
            vec![up(Slot::One), down(Slot::Two)]
        );
    }

    #[test]
    fn peer_combines_host_and_keyboard() {
        let session = network_session(Role::Peer, "b");
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::ArrowDown);

        let mut network = NetworkInputs::new();
        network.apply(&input_event("a", vec![up(Slot::One)]), Some(&"b".into()));

        assert_eq!(
            compose(Some(&session), &keyboard, &network),
            vec![up(Slot::One), down(Slot::Two)]
        );
    }

    #[test]
    fn observer_without_history_gets_nothing() {
        let session = network_session(Role::Observer, "watcher");
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::KeyW);
        keyboard.press(KeyCode::ArrowUp);

        assert!(compose(Some(&session), &keyboard, &NetworkInputs::new()).is_empty());
    }

    #[test]
    fn empty_history_never_falls_back_to_keyboard() {
        let mut keyboard = KeyboardState::new();
        for key in [KeyCode::KeyW, KeyCode::KeyS, KeyCode::ArrowUp, KeyCode::ArrowDown] {
            keyboard.press(key);
        }
        let network = NetworkInputs::new();

        for (role, me) in [(Role::Host, "a"), (Role::Peer, "b"), (Role::Observer, "w")] {
            let session = network_session(role, me);
            let composed = compose(Some(&session), &keyboard, &network);
            for (slot, source) in source_plan(role) {
                if source == InputSource::Network {
                    assert!(composed.iter().all(|i| i.slot != slot), "{role} slot {slot}");
                }
            }
        }
    }

    #[test]
    fn local_uses_both_keyboard_slots() {
        let session = Session::Local(LocalSession::running());
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::ArrowUp);
        keyboard.press(KeyCode::KeyS);

        assert_eq!(
            compose(Some(&session), &keyboard, &NetworkInputs::new()),
            vec![down(Slot::One), up(Slot::Two)]
        );
    }

    #[test]
    fn latest_event_wins_and_own_echo_is_ignored() {
        let me: ActorId = "a".into();
        let mut network = NetworkInputs::new();
        assert!(network.apply(&input_event("b", vec![up(Slot::Two)]), Some(&me)));
        assert!(network.apply(&input_event("b", vec![]), Some(&me)));
        assert!(!network.apply(&input_event("a", vec![up(Slot::One)]), Some(&me)));

        assert!(network.inputs_of(&"b".into()).is_empty());
        assert!(network.inputs_of(&"a".into()).is_empty());
    }

    #[test]
    fn composer_publishes_on_change_only() {
        let session = network_session(Role::Host, "a");
        let mut composer = InputComposer::new();
        let mut rx = composer.subscribe();
        let mut keyboard = KeyboardState::new();

        composer.recompute(Some(&session), &keyboard);
        assert!(!rx.has_changed().unwrap());

        keyboard.press(KeyCode::KeyW);
        composer.recompute(Some(&session), &keyboard);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), vec![up(Slot::One)]);

        composer.reset();
        assert!(rx.borrow_and_update().is_empty());
    }
}
