//! # Project Views
//!
//! Read-side shapes returned to the surrounding CRUD layer.

use super::events::{AI_SENDER_EMAIL, AI_SENDER_ID};
use super::file_tree::FileTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public profile of a user, as substituted into hydrated messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
}

impl UserProfile {
    pub fn assistant() -> Self {
        Self {
            id: AI_SENDER_ID.to_string(),
            email: AI_SENDER_EMAIL.to_string(),
        }
    }
}

/// A ledger message whose sender reference has been replaced by the profile.
///
/// `sender` is `None` when the referenced user no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedMessage {
    pub id: Uuid,
    pub sender: Option<UserProfile>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Project aggregate with members and messages hydrated at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedProject {
    pub id: Uuid,
    pub name: String,
    pub users: Vec<UserProfile>,
    pub messages: Vec<HydratedMessage>,
    pub file_tree: FileTree,
}
