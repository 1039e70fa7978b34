use paso_core::types::ChangeDescriptor;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;

/// Kinds an `EventEnvelope` can carry over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DatabaseChanged,
    Ping,
    Pong,
}

/// The payload of a `Message::Event` — a database change plus the
/// broadcaster-assigned monotonic sequence id, used by subscribers to
/// detect a gap and trigger a full reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_type: EventType,
    pub project_id: i64,
    pub sequence_id: Option<u64>,
    pub change: Option<ChangeDescriptor>,
}

impl EventEnvelope {
    pub fn database_changed(sequence_id: u64, change: ChangeDescriptor) -> Self {
        EventEnvelope {
            event_type: EventType::DatabaseChanged,
            project_id: change.project_id.0,
            sequence_id: Some(sequence_id),
            change: Some(change),
        }
    }

    /// Built by a publisher (CLI/TUI) submitting a change to the daemon.
    /// The daemon assigns the real sequence id when it re-broadcasts.
    pub fn unsequenced(change: ChangeDescriptor) -> Self {
        EventEnvelope {
            event_type: EventType::DatabaseChanged,
            project_id: change.project_id.0,
            sequence_id: None,
            change: Some(change),
        }
    }
}

/// Tagged-enum message body, framed with a length prefix on the wire. Every
/// message also carries a `version`; an unrecognized version is still
/// decoded and delivered on a best-effort basis rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub version: u32,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MessageBody {
    Subscribe { project_id: i64 },
    Event(EventEnvelope),
    Ping,
    Pong,
}

impl Message {
    pub fn new(body: MessageBody) -> Self {
        Message { version: PROTOCOL_VERSION, body }
    }

    pub fn subscribe(project_id: i64) -> Self {
        Message::new(MessageBody::Subscribe { project_id })
    }

    pub fn ping() -> Self {
        Message::new(MessageBody::Ping)
    }

    pub fn pong() -> Self {
        Message::new(MessageBody::Pong)
    }

    pub fn event(envelope: EventEnvelope) -> Self {
        Message::new(MessageBody::Event(envelope))
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paso_core::types::{ChangeKind, EntityKind, ProjectId};

    #[test]
    fn round_trips_subscribe() {
        let msg = Message::subscribe(7);
        let bytes = msg.encode().unwrap();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.version, PROTOCOL_VERSION);
        assert!(matches!(decoded.body, MessageBody::Subscribe { project_id: 7 }));
    }

    #[test]
    fn round_trips_event_with_change() {
        let change = ChangeDescriptor {
            project_id: ProjectId(3),
            entity_kind: EntityKind::Task,
            entity_id: Some(9),
            kind: ChangeKind::Moved,
        };
        let msg = Message::event(EventEnvelope::database_changed(42, change));
        let bytes = msg.encode().unwrap();
        let decoded = Message::decode(&bytes).unwrap();
        match decoded.body {
            MessageBody::Event(env) => {
                assert_eq!(env.sequence_id, Some(42));
                assert_eq!(env.project_id, 3);
            }
            _ => panic!("expected event"),
        }
    }

    #[test]
    fn unknown_version_still_decodes() {
        let raw = serde_json::json!({ "version": 999, "type": "ping" });
        let decoded: Message = serde_json::from_value(raw).unwrap();
        assert!(matches!(decoded.body, MessageBody::Ping));
    }
}
