//! # Collaboration Session
//!
//! One live connection bound to a verified identity and one project room.
//!
//! ```text
//! Connecting ──► Rejected                       (handshake refused)
//! Connecting ──► Joined ──► Active ──► Disconnected
//!                   └──────────────────►┘
//! ```
//!
//! Nothing about a session is persisted. A client that reconnects goes through
//! the gateway again and gets a fresh session.

use crate::chat::ai_bridge::AiBridge;
use crate::chat::rooms::{ConnectionId, EventReceiver, RoomManager};
use futures_util::FutureExt;
use lib_auth::Identity;
use lib_core::dto::{ClientEvent, ServerEvent};
use lib_core::model::store::Project;
use lib_core::{AppError, Result};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Rejected,
    Joined,
    Active,
    Disconnected,
}

impl SessionPhase {
    pub fn can_advance_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (Connecting, Rejected)
                | (Connecting, Joined)
                | (Joined, Active)
                | (Joined, Disconnected)
                | (Active, Disconnected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Rejected | SessionPhase::Disconnected)
    }
}

/// An admitted connection.
#[derive(Debug)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    /// Room key. Always set, even when the project itself was not found.
    pub project_id: Uuid,
    pub project: Option<Project>,
    phase: SessionPhase,
}

impl Session {
    pub fn new(identity: Identity, project_id: Uuid, project: Option<Project>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            identity,
            project_id,
            project,
            phase: SessionPhase::Connecting,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Move to `next` if the transition is allowed. Returns whether it moved.
    pub fn advance(&mut self, next: SessionPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            if self.phase != next {
                warn!(
                    connection_id = %self.connection_id,
                    from = ?self.phase,
                    to = ?next,
                    "[WS] Ignored invalid session transition"
                );
            }
            return false;
        }

        debug!(
            connection_id = %self.connection_id,
            user_id = %self.identity.user_id,
            from = ?self.phase,
            to = ?next,
            "[WS] Session {:?} -> {:?}",
            self.phase,
            next
        );
        self.phase = next;
        true
    }

    /// Enrol in the project room. `None` if the room manager is closed.
    pub async fn join(&mut self, rooms: &RoomManager) -> Option<EventReceiver> {
        let rx = rooms.join(self.project_id, self.connection_id).await?;
        self.advance(SessionPhase::Joined);
        Some(rx)
    }

    /// Handle one inbound text frame.
    ///
    /// Errors and panics are turned into a private `error` event; the
    /// connection stays open either way.
    pub async fn handle_frame(&mut self, rooms: &RoomManager, bridge: &Arc<AiBridge>, frame: &str) {
        if self.phase == SessionPhase::Joined {
            self.advance(SessionPhase::Active);
        }

        let outcome = AssertUnwindSafe(self.dispatch(rooms, bridge, frame))
            .catch_unwind()
            .await;

        let notice = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                warn!(connection_id = %self.connection_id, error = %e, "[WS] Event rejected");
                e.user_message()
            }
            Err(_) => {
                error!(connection_id = %self.connection_id, "[WS] Event handler panicked");
                "Failed to process event".to_string()
            }
        };

        rooms
            .send_to(self.project_id, self.connection_id, ServerEvent::error(notice))
            .await;
    }

    async fn dispatch(&self, rooms: &RoomManager, bridge: &Arc<AiBridge>, frame: &str) -> Result<()> {
        let event: ClientEvent = serde_json::from_str(frame)
            .map_err(|e| AppError::InvalidInput(format!("Malformed event: {}", e)))?;

        match event {
            ClientEvent::ProjectMessage(msg) => {
                let prompt = bridge.extract_prompt(msg.message());
                let delivered = rooms
                    .broadcast(self.project_id, self.connection_id, &ServerEvent::ProjectMessage(msg))
                    .await;

                debug!(
                    connection_id = %self.connection_id,
                    project_id = %self.project_id,
                    delivered,
                    ai_triggered = prompt.is_some(),
                    "[WS] Relayed project-message"
                );

                if let Some(prompt) = prompt {
                    info!(
                        connection_id = %self.connection_id,
                        project_id = %self.project_id,
                        "[AI] Trigger detected"
                    );
                    bridge.spawn_reply(rooms.clone(), self.project_id, self.connection_id, prompt);
                }
            }
            ClientEvent::Event(_) => {
                debug!(connection_id = %self.connection_id, "[WS] Reserved event ignored");
            }
        }

        Ok(())
    }

    /// Leave the room. Safe to call more than once.
    pub async fn disconnect(&mut self, rooms: &RoomManager) {
        rooms.leave(self.project_id, self.connection_id).await;
        self.advance(SessionPhase::Disconnected);
    }
}
