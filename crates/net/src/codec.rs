//! Two-stage JSON encoding.
//!
//! Inbound frames are a JSON array of `{topic, event}` envelopes whose
//! `event` is itself a JSON string; outbound frames are a single
//! `{msg_type, payload}` object whose `payload` is itself a JSON string.
//! Both inner documents are decoded in a second pass.

use crate::error::CodecError;
use crate::protocol::{GameEvent, MessageType, OutboundMessage, RawEnvelope, Topic, WireMessage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Encode an outbound message into one text frame.
pub fn encode_outbound(msg: &OutboundMessage) -> Result<String, CodecError> {
    let payload = match msg {
        OutboundMessage::Snapshot(snapshot) => serde_json::to_string(snapshot),
        OutboundMessage::Heartbeat(heartbeat) => serde_json::to_string(heartbeat),
    }
    .map_err(CodecError::Encode)?;

    let wire = WireMessage {
        msg_type: msg.message_type(),
        payload,
    };
    serde_json::to_string(&wire).map_err(CodecError::Encode)
}

/// Decode an outbound text frame.
///
/// The server side of the protocol; used by tests and tooling.
pub fn decode_outbound(text: &str) -> Result<OutboundMessage, CodecError> {
    let wire: WireMessage = serde_json::from_str(text).map_err(CodecError::Frame)?;
    let payload_err = |source| CodecError::Payload {
        msg_type: wire.msg_type,
        source,
    };
    let msg = match wire.msg_type {
        MessageType::SessionSnapshot => {
            OutboundMessage::Snapshot(serde_json::from_str(&wire.payload).map_err(payload_err)?)
        }
        MessageType::HeartBeat => {
            OutboundMessage::Heartbeat(serde_json::from_str(&wire.payload).map_err(payload_err)?)
        }
    };
    Ok(msg)
}

/// Decode the inner document of one envelope.
///
/// Returns `Ok(None)` for topics this client does not consume.
pub fn decode_event(envelope: &RawEnvelope) -> Result<Option<GameEvent>, CodecError> {
    let Some(topic) = Topic::parse(&envelope.topic) else {
        return Ok(None);
    };

    let event = match topic {
        Topic::Session => GameEvent::Session(inner(envelope)?),
        Topic::Input => GameEvent::Input(inner(envelope)?),
        Topic::Move => GameEvent::Move(inner(envelope)?),
        Topic::Tick => GameEvent::Tick(inner(envelope)?),
        Topic::Status => GameEvent::Status(inner(envelope)?),
    };

    event.verify().map_err(|reason| CodecError::Invalid {
        topic: envelope.topic.clone(),
        reason,
    })?;
    Ok(Some(event))
}

fn inner<T: DeserializeOwned>(envelope: &RawEnvelope) -> Result<T, CodecError> {
    serde_json::from_str(&envelope.event).map_err(|source| CodecError::Event {
        topic: envelope.topic.clone(),
        source,
    })
}

/// Decode one inbound text frame into its events, in arrival order.
///
/// A malformed outer array fails the whole frame. A malformed or invalid
/// inner event is dropped with a warning and the rest of the batch is kept.
pub fn decode_frame(text: &str) -> Result<Vec<GameEvent>, CodecError> {
    let envelopes: Vec<RawEnvelope> = serde_json::from_str(text).map_err(CodecError::Frame)?;

    let mut events = Vec::with_capacity(envelopes.len());
    for envelope in &envelopes {
        match decode_event(envelope) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => debug!(topic = %envelope.topic, "Skipping unknown topic"),
            Err(e) => warn!("Dropping event: {}", e),
        }
    }
    Ok(events)
}

/// Encode events into an inbound text frame.
///
/// The server side of the protocol; used by tests and tooling.
pub fn encode_frame(events: &[GameEvent]) -> Result<String, CodecError> {
    let envelopes = events
        .iter()
        .map(|event| {
            let encoded = match event {
                GameEvent::Session(e) => to_inner(e),
                GameEvent::Input(e) => to_inner(e),
                GameEvent::Move(e) => to_inner(e),
                GameEvent::Tick(e) => to_inner(e),
                GameEvent::Status(e) => to_inner(e),
            }?;
            Ok(RawEnvelope {
                topic: event.topic().as_str().to_string(),
                event: encoded,
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;
    serde_json::to_string(&envelopes).map_err(CodecError::Encode)
}

fn to_inner<T: Serialize>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(CodecError::Encode)
}
