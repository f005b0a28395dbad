use crate::dto::FileTree;
use crate::dto::events::AI_SENDER_ID;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A user as known to the collaboration core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A project with its stored file tree. Members and messages load separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub file_tree: FileTree,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who wrote a ledger message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderRef {
    User(Uuid),
    Assistant,
}

impl fmt::Display for SenderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderRef::User(id) => write!(f, "{}", id),
            SenderRef::Assistant => write!(f, "{}", AI_SENDER_ID),
        }
    }
}

impl FromStr for SenderRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == AI_SENDER_ID {
            return Ok(SenderRef::Assistant);
        }
        Uuid::parse_str(s)
            .map(SenderRef::User)
            .map_err(|_| format!("Invalid sender reference: {}", s))
    }
}

impl Serialize for SenderRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SenderRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A stored chat message with its retention deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub sender: SenderRef,
    #[serde(rename = "message")]
    pub text: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
