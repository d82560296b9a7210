//! Event multiplexer: splits inbound batches into per-topic sub-streams.
//!
//! Each topic keeps its own subscriber list with unbounded queues, so a slow
//! reader on one topic never holds up another. Within a topic, events keep
//! their arrival order and arrive grouped per inbound batch.

use crate::protocol::{
    GameEvent, InputEvent, MoveEvent, SessionEvent, SessionSnapshot, StatusEvent,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Receiving end of one topic subscription.
pub type TopicReceiver<T> = mpsc::UnboundedReceiver<Vec<T>>;

/// Push-based stream of event batches for one topic.
#[derive(Debug)]
pub struct SubStream<T> {
    subscribers: Vec<mpsc::UnboundedSender<Vec<T>>>,
}

impl<T> Default for SubStream<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> SubStream<T> {
    /// Add a subscriber.
    pub fn subscribe(&mut self) -> TopicReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Push a batch to every live subscriber, pruning dropped ones.
    ///
    /// Empty batches are not published. Returns the number of subscribers
    /// reached.
    pub fn publish(&mut self, batch: Vec<T>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        self.subscribers.retain(|tx| tx.send(batch.clone()).is_ok());
        self.subscribers.len()
    }

    /// Live subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Release all subscribers; their receivers see end of stream.
    pub fn close(&mut self) {
        self.subscribers.clear();
    }
}

/// Applies session events to the live session.
pub trait SessionReconciler {
    /// Called once per batch that carries session events, in arrival order.
    fn reconcile_batch(&mut self, events: &[SessionEvent]);
}

impl<F: FnMut(&[SessionEvent])> SessionReconciler for F {
    fn reconcile_batch(&mut self, events: &[SessionEvent]) {
        self(events)
    }
}

/// Per-topic event counts of one dispatched batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// `session` events.
    pub session: usize,
    /// `input` events.
    pub input: usize,
    /// `move` events.
    pub moves: usize,
    /// `tick` events.
    pub ticks: usize,
    /// `status` events.
    pub status: usize,
}

impl DispatchSummary {
    /// Total events dispatched.
    pub fn total(&self) -> usize {
        self.session + self.input + self.moves + self.ticks + self.status
    }
}

/// Five-way topic multiplexer.
#[derive(Debug, Default)]
pub struct EventMultiplexer {
    session: SubStream<SessionEvent>,
    input: SubStream<InputEvent>,
    moves: SubStream<MoveEvent>,
    ticks: SubStream<SessionSnapshot>,
    status: SubStream<StatusEvent>,
    closed: bool,
}

impl EventMultiplexer {
    /// Create a multiplexer with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `session` events.
    pub fn subscribe_session(&mut self) -> TopicReceiver<SessionEvent> {
        self.session.subscribe()
    }

    /// Subscribe to `input` events.
    pub fn subscribe_input(&mut self) -> TopicReceiver<InputEvent> {
        self.input.subscribe()
    }

    /// Subscribe to `move` events.
    pub fn subscribe_moves(&mut self) -> TopicReceiver<MoveEvent> {
        self.moves.subscribe()
    }

    /// Subscribe to `tick` snapshots.
    pub fn subscribe_ticks(&mut self) -> TopicReceiver<SessionSnapshot> {
        self.ticks.subscribe()
    }

    /// Subscribe to `status` events.
    pub fn subscribe_status(&mut self) -> TopicReceiver<StatusEvent> {
        self.status.subscribe()
    }

    /// Partition a batch by topic and push each part to its subscribers.
    ///
    /// Session events are handed to `reconciler` before any sub-stream is
    /// published, so subscribers observe the reconciled session.
    pub fn dispatch(
        &mut self,
        batch: Vec<GameEvent>,
        reconciler: &mut dyn SessionReconciler,
    ) -> DispatchSummary {
        if self.closed {
            debug!(count = batch.len(), "Multiplexer closed, dropping batch");
            return DispatchSummary::default();
        }

        let mut session = Vec::new();
        let mut input = Vec::new();
        let mut moves = Vec::new();
        let mut ticks = Vec::new();
        let mut status = Vec::new();
        for event in batch {
            match event {
                GameEvent::Session(e) => session.push(e),
                GameEvent::Input(e) => input.push(e),
                GameEvent::Move(e) => moves.push(e),
                GameEvent::Tick(e) => ticks.push(e),
                GameEvent::Status(e) => status.push(e),
            }
        }

        let summary = DispatchSummary {
            session: session.len(),
            input: input.len(),
            moves: moves.len(),
            ticks: ticks.len(),
            status: status.len(),
        };
        trace!(?summary, "Dispatching batch");

        if !session.is_empty() {
            reconciler.reconcile_batch(&session);
        }
        self.session.publish(session);
        self.input.publish(input);
        self.moves.publish(moves);
        self.ticks.publish(ticks);
        self.status.publish(status);
        summary
    }

    /// Release every subscriber and drop further batches.
    pub fn close(&mut self) {
        debug!("Closing multiplexer");
        self.closed = true;
        self.session.close();
        self.input.close();
        self.moves.close();
        self.ticks.close();
        self.status.close();
    }
}
