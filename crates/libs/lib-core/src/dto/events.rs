//! # Collaboration Events
//!
//! Every WebSocket text frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Frames are decoded into [`ClientEvent`] at the connection boundary before
//! anything is dispatched; the server only ever writes [`ServerEvent`]s.
//!
//! A relayed `project-message` keeps the exact JSON the client sent. The
//! payload is checked against [`MessagePayload`] on the way in, but peers get
//! the original object, extra fields and key order included. File-tree updates
//! ride the same channel as a JSON string in `message`, e.g.
//! `"{\"fileTree\":{...}}"`, and are relayed like any other text.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

/// Reserved sender id for messages produced by the AI co-author.
pub const AI_SENDER_ID: &str = "ai";

/// Display address used for the AI co-author.
pub const AI_SENDER_EMAIL: &str = "AI";

/// Sender descriptor carried on every chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderInfo {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
}

impl SenderInfo {
    /// The synthetic identity used for generated messages.
    pub fn assistant() -> Self {
        Self {
            id: AI_SENDER_ID.to_string(),
            email: AI_SENDER_EMAIL.to_string(),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.id == AI_SENDER_ID
    }
}

/// A chat message as it travels between room members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message: String,
    pub sender: SenderInfo,
}

/// A chat message as it goes over the wire: the validated fields plus the
/// original JSON object, which is what gets serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedMessage {
    payload: MessagePayload,
    raw: Value,
}

impl RelayedMessage {
    pub fn payload(&self) -> &MessagePayload {
        &self.payload
    }

    pub fn message(&self) -> &str {
        &self.payload.message
    }

    pub fn sender(&self) -> &SenderInfo {
        &self.payload.sender
    }

    /// The JSON object exactly as received (or as built for server messages).
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl From<MessagePayload> for RelayedMessage {
    fn from(payload: MessagePayload) -> Self {
        let raw = json!({
            "message": payload.message,
            "sender": { "id": payload.sender.id, "email": payload.sender.email },
        });
        Self { payload, raw }
    }
}

impl Serialize for RelayedMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RelayedMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let payload = MessagePayload::deserialize(&raw).map_err(D::Error::custom)?;
        Ok(Self { payload, raw })
    }
}

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Chat message to relay to the rest of the room.
    #[serde(rename = "project-message")]
    ProjectMessage(RelayedMessage),

    /// Reserved extension channel; accepted and ignored.
    #[serde(rename = "event")]
    Event(serde_json::Value),
}

/// Events the server sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "project-message")]
    ProjectMessage(RelayedMessage),

    /// Private notification for the receiving connection only.
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_project_message_from_legacy_sender() {
        let frame = json!({
            "event": "project-message",
            "data": {
                "message": "hello",
                "sender": { "_id": "u1", "email": "ada@example.com" }
            }
        });

        let event: ClientEvent = serde_json::from_value(frame).unwrap();

        match event {
            ClientEvent::ProjectMessage(msg) => {
                assert_eq!(msg.message(), "hello");
                assert_eq!(msg.sender().id, "u1");
                assert_eq!(msg.raw()["sender"]["_id"], "u1");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_relay_reencodes_data_byte_for_byte() {
        let data = r#"{"sender":{"_id":"u1","email":"a@x"},"message":"hi","timestamp":"t"}"#;
        let frame = format!(r#"{{"event":"project-message","data":{}}}"#, data);

        let event: ClientEvent = serde_json::from_str(&frame).unwrap();
        let ClientEvent::ProjectMessage(msg) = event else {
            panic!("expected project-message");
        };
        let out = serde_json::to_string(&ServerEvent::ProjectMessage(msg)).unwrap();

        assert_eq!(out, frame);
    }

    #[test]
    fn test_payload_missing_sender_is_rejected() {
        let frame = json!({ "event": "project-message", "data": { "message": "hi" } });
        assert!(serde_json::from_value::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn test_server_built_message_shape() {
        let msg = RelayedMessage::from(MessagePayload {
            message: "done".to_string(),
            sender: SenderInfo::assistant(),
        });

        let value = serde_json::to_value(ServerEvent::ProjectMessage(msg)).unwrap();

        assert_eq!(
            value,
            json!({
                "event": "project-message",
                "data": { "message": "done", "sender": { "id": "ai", "email": "AI" } }
            })
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let frame = json!({ "event": "drop-tables", "data": {} });
        assert!(serde_json::from_value::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn test_error_event_shape() {
        let value = serde_json::to_value(ServerEvent::error("boom")).unwrap();
        assert_eq!(value, json!({ "event": "error", "data": { "message": "boom" } }));
    }

    #[test]
    fn test_assistant_sender() {
        let sender = SenderInfo::assistant();
        assert!(sender.is_assistant());
        assert_eq!(sender.email, "AI");
    }
}
