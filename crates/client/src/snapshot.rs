//! Per-frame snapshot production for active players.

use pong_sync_core::{GameObject, Millis, Role, Session, SessionState};
use pong_sync_input::KeyboardState;
use pong_sync_net::SessionSnapshot;

/// Build this frame's snapshot, if the session's role sends one.
///
/// The host attaches object positions from `objects`; the peer never does.
/// Observers, local play and closed sessions produce nothing.
pub fn build_snapshot(
    session: &Session,
    keyboard: &KeyboardState,
    objects: impl FnOnce() -> Vec<GameObject>,
    ts: Millis,
) -> Option<SessionSnapshot> {
    let network = session.as_network()?;
    if network.state == SessionState::Closed {
        return None;
    }
    let slot = network.role.keyboard_slot()?;
    let objects = match network.role {
        Role::Host => Some(objects()),
        _ => None,
    };

    Some(SessionSnapshot {
        session_id: network.session_id.clone(),
        inputs: keyboard.inputs_for(slot),
        objects,
        player_id: network.me.id.clone(),
        ts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pong_sync_core::{
        Actor, Direction, Input, LocalSession, NetworkSession, Player, Slot,
    };
    use winit::keyboard::KeyCode;

    fn session(role: Role, me: &str) -> Session {
        Session::Network(NetworkSession {
            session_id: "s1".into(),
            role,
            state: SessionState::Running,
            players: vec![Player::new("a", Slot::One), Player::new("b", Slot::Two)],
            me: Actor::new(me),
        })
    }

    fn ball() -> Vec<GameObject> {
        vec![GameObject {
            id: 2,
            x: 400.0,
            y: 300.0,
            orientation_x: 1.0,
            orientation_y: 0.0,
            vel_x: -0.5,
            vel_y: 0.25,
            shape_param_1: 10,
            shape_param_2: 0,
        }]
    }

    fn both_paddles_held() -> KeyboardState {
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::KeyW);
        keyboard.press(KeyCode::ArrowDown);
        keyboard
    }

    #[test]
    fn host_snapshot_carries_objects_and_slot_one() {
        let snapshot = build_snapshot(&session(Role::Host, "a"), &both_paddles_held(), ball, 7)
            .expect("host sends");
        assert_eq!(snapshot.inputs, vec![Input::paddle(Direction::Up, Slot::One)]);
        assert_eq!(snapshot.objects, Some(ball()));
        assert_eq!(snapshot.player_id.as_str(), "a");
        assert_eq!(snapshot.ts, 7);
    }

    #[test]
    fn peer_snapshot_never_carries_objects() {
        let snapshot = build_snapshot(&session(Role::Peer, "b"), &both_paddles_held(), ball, 7)
            .expect("peer sends");
        assert_eq!(snapshot.inputs, vec![Input::paddle(Direction::Down, Slot::Two)]);
        assert_eq!(snapshot.objects, None);
    }

    #[test]
    fn observer_and_local_send_nothing() {
        let keyboard = both_paddles_held();
        assert!(build_snapshot(&session(Role::Observer, "w"), &keyboard, ball, 0).is_none());
        assert!(
            build_snapshot(&Session::Local(LocalSession::running()), &keyboard, ball, 0).is_none()
        );
    }

    #[test]
    fn closed_session_sends_nothing() {
        let mut closed = session(Role::Host, "a");
        if let Session::Network(network) = &mut closed {
            network.state = SessionState::Closed;
        }
        assert!(build_snapshot(&closed, &both_paddles_held(), ball, 0).is_none());
    }
}
