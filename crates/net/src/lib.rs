#![warn(missing_docs)]
//! Networking for the sync core: wire protocol, the real-time transport
//! channel to the session server, and per-topic event multiplexing.

mod channel;
mod codec;
mod connection;
mod error;
mod memory;
mod protocol;
mod transport;

pub use channel::{
    DispatchSummary, EventMultiplexer, SessionReconciler, SubStream, TopicReceiver,
};
pub use codec::{decode_event, decode_frame, decode_outbound, encode_frame, encode_outbound};
pub use connection::{Channel, ChannelEvent, ChannelSender, Connected, ConnectionManager};
pub use error::{CodecError, TransportError};
pub use memory::{memory_pair, ConnectBehavior, MemoryConnector, MemoryPeer, MemoryTransport};
pub use protocol::{
    GameEvent, Heartbeat, InputEvent, MessageType, MoveEvent, OutboundMessage, RawEnvelope,
    SessionEvent, SessionPayload, SessionSnapshot, StatusEvent, Topic, WireMessage,
    PROTOCOL_VERSION,
};
pub use transport::{
    establish, poll_until_ready, ConnectTarget, Connector, RetryPolicy, Transport,
    WebSocketConnector, WebSocketTransport,
};
