//! Liveness messages for quiet connections.
//!
//! Snapshots double as keep-alives; a heartbeat only goes out when no
//! snapshot was sent within the last interval.

use pong_sync_core::{now_millis, ActorId, SessionId};
use pong_sync_net::{ChannelSender, Heartbeat, OutboundMessage};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Whether a heartbeat should be sent at `now`.
pub fn heartbeat_due(now: Instant, last_snapshot: Option<Instant>, interval: Duration) -> bool {
    match last_snapshot {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= interval,
    }
}

/// Time of the most recent snapshot send, shared with the heartbeat task.
#[derive(Debug)]
pub struct SnapshotClock {
    tx: watch::Sender<Option<Instant>>,
}

impl Default for SnapshotClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotClock {
    /// A clock that has seen no snapshot.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Record a snapshot sent now.
    pub fn record(&self) {
        self.tx.send_replace(Some(Instant::now()));
    }

    /// Time of the last recorded snapshot.
    pub fn last(&self) -> Option<Instant> {
        *self.tx.borrow()
    }

    /// Forget the last snapshot.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    fn watch(&self) -> watch::Receiver<Option<Instant>> {
        self.tx.subscribe()
    }
}

/// Running heartbeat task. Aborted on [`cancel`](Self::cancel) or drop.
#[derive(Debug)]
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Stop sending heartbeats.
    pub fn cancel(self) {
        // Drop aborts.
    }

    /// Whether the task has stopped on its own (channel closed).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start the heartbeat for one session. The first check runs one
/// `interval` after the call.
pub fn spawn_heartbeat(
    sender: ChannelSender,
    session_id: SessionId,
    player_id: ActorId,
    interval: Duration,
    clock: &SnapshotClock,
) -> HeartbeatHandle {
    let last_snapshot = clock.watch();
    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(session = %session_id, "Heartbeat started");

        loop {
            let now = ticker.tick().await;
            let last = *last_snapshot.borrow();
            if !heartbeat_due(now, last, interval) {
                trace!("Recent snapshot, skipping heartbeat");
                continue;
            }

            let heartbeat = Heartbeat {
                session_id: session_id.clone(),
                player_id: player_id.clone(),
                ts: now_millis(),
            };
            if !sender.send(&OutboundMessage::Heartbeat(heartbeat)) {
                debug!(session = %session_id, "Channel closed, heartbeat stopped");
                break;
            }
            trace!("Heartbeat sent");
        }
    });
    HeartbeatHandle { task }
}
