//! Property tests for heartbeat suppression and input composition

use pong_sync_client::{
    compose, heartbeat_due, source_plan, spawn_heartbeat, InputSource, NetworkInputs,
    SnapshotClock,
};
use pong_sync_core::{Actor, NetworkSession, Player, Role, Session, SessionState, Slot};
use pong_sync_input::KeyboardState;
use pong_sync_net::{memory_pair, Channel, ConnectTarget};
use proptest::prelude::*;
use std::time::Duration;
use tokio::time::Instant;
use winit::keyboard::KeyCode;

const INTERVAL_MS: u64 = 1000;
const RUN_MS: u64 = 6500;

/// Run a heartbeat for `RUN_MS` of paused time, recording a snapshot at each
/// offset in `snapshots_ms`. Returns the offsets at which heartbeats arrived.
fn heartbeat_times(snapshots_ms: &[u64]) -> Vec<u64> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async {
        let (transport, mut peer) = memory_pair();
        let target = ConnectTarget::new("s1".into(), "a".into(), Role::Host);
        let (channel, _events) = Channel::open(transport, target);
        let clock = SnapshotClock::new();
        let start = Instant::now();

        let collector = tokio::spawn(async move {
            let mut arrivals = Vec::new();
            while peer.next_sent().await.is_some() {
                arrivals.push(start.elapsed().as_millis() as u64);
            }
            arrivals
        });

        let handle = spawn_heartbeat(
            channel.sender(),
            "s1".into(),
            "a".into(),
            Duration::from_millis(INTERVAL_MS),
            &clock,
        );
        for &at in snapshots_ms {
            tokio::time::sleep_until(start + Duration::from_millis(at)).await;
            clock.record();
        }
        tokio::time::sleep_until(start + Duration::from_millis(RUN_MS)).await;

        handle.cancel();
        channel.shutdown().await;
        collector.await.unwrap()
    })
}

/// Snapshot offsets that never coincide with a heartbeat tick.
fn snapshot_offsets() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec((0u64..6, 1u64..INTERVAL_MS), 0..8).prop_map(|pairs| {
        let mut offsets: Vec<u64> = pairs
            .into_iter()
            .map(|(second, ms)| second * INTERVAL_MS + ms)
            .collect();
        offsets.sort_unstable();
        offsets
    })
}

const KEYS: [KeyCode; 6] = [
    KeyCode::KeyW,
    KeyCode::KeyS,
    KeyCode::ArrowUp,
    KeyCode::ArrowDown,
    KeyCode::KeyA,
    KeyCode::Space,
];

fn network_role() -> impl Strategy<Value = Role> {
    prop::sample::select(vec![Role::Host, Role::Peer, Role::Observer])
}

proptest! {
    /// Property: A heartbeat is due exactly when the last snapshot is at
    /// least one interval old
    #[test]
    fn heartbeat_due_iff_snapshot_stale(
        interval_ms in 1u64..5_000,
        age_ms in 0u64..10_000,
    ) {
        let base = Instant::from_std(std::time::Instant::now());
        let interval = Duration::from_millis(interval_ms);
        let now = base + Duration::from_millis(age_ms);

        prop_assert_eq!(heartbeat_due(now, Some(base), interval), age_ms >= interval_ms);
        prop_assert!(heartbeat_due(now, None, interval));
    }

    /// Property: The running heartbeat never fires within one interval of a
    /// snapshot, and fires on every tick that had no snapshot before it
    #[test]
    fn heartbeat_task_respects_snapshots(snapshots in snapshot_offsets()) {
        let sent = heartbeat_times(&snapshots);

        let expected: Vec<u64> = (1..=RUN_MS / INTERVAL_MS)
            .map(|k| k * INTERVAL_MS)
            .filter(|&tick| !snapshots.iter().any(|&s| s < tick && tick - s < INTERVAL_MS))
            .collect();
        prop_assert_eq!(&sent, &expected);

        for &beat in &sent {
            prop_assert!(snapshots.iter().all(|&s| s > beat || beat - s >= INTERVAL_MS));
        }
    }

    /// Property: Slots fed from the network contribute nothing while no
    /// input event has arrived, whatever keys are held
    #[test]
    fn empty_history_contributes_nothing(
        role in network_role(),
        held in prop::collection::vec(prop::sample::select(KEYS.to_vec()), 0..8),
    ) {
        let mut keyboard = KeyboardState::new();
        for key in held {
            keyboard.press(key);
        }
        let session = Session::Network(NetworkSession {
            session_id: "s1".into(),
            role,
            state: SessionState::Running,
            players: vec![Player::new("a", Slot::One), Player::new("b", Slot::Two)],
            me: Actor::new("me"),
        });

        let composed = compose(Some(&session), &keyboard, &NetworkInputs::new());
        for (slot, source) in source_plan(role) {
            if source == InputSource::Network {
                prop_assert!(composed.iter().all(|input| input.slot != slot));
            }
        }
        prop_assert!(composed.len() <= 2);
    }
}
