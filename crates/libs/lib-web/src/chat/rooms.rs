//! # Room Manager
//!
//! In-memory registry of live connections grouped by project.
//!
//! Each member owns an unbounded queue drained by its socket writer task, so a
//! broadcast never waits on a slow peer. Delivery is best effort: a member whose
//! writer has already gone away simply misses the event.
//!
//! The manager is created once at startup and shared by clone. [`RoomManager::close`]
//! drops every queue at shutdown, which ends all writer tasks.

use lib_core::dto::ServerEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of one live connection.
pub type ConnectionId = Uuid;

/// Receiving side of a member queue.
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Default)]
struct Registry {
    rooms: HashMap<Uuid, HashMap<ConnectionId, EventSender>>,
    closed: bool,
}

/// Shared room registry keyed by project id.
#[derive(Clone, Default)]
pub struct RoomManager {
    inner: Arc<RwLock<Registry>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrol `connection_id` in the room of `project_id`.
    ///
    /// Returns the member's event queue, or `None` once the manager is closed.
    /// Joining twice with the same connection id replaces the old queue.
    pub async fn join(&self, project_id: Uuid, connection_id: ConnectionId) -> Option<EventReceiver> {
        let mut registry = self.inner.write().await;
        if registry.closed {
            warn!(project_id = %project_id, connection_id = %connection_id, "[ROOM] Join refused, manager closed");
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let room = registry.rooms.entry(project_id).or_default();
        room.insert(connection_id, tx);

        info!(
            project_id = %project_id,
            connection_id = %connection_id,
            members = room.len(),
            "[ROOM] JOIN project={} members={}",
            project_id,
            room.len()
        );
        Some(rx)
    }

    /// Remove `connection_id` from its room. Empty rooms are dropped.
    pub async fn leave(&self, project_id: Uuid, connection_id: ConnectionId) -> bool {
        let mut registry = self.inner.write().await;
        let Some(room) = registry.rooms.get_mut(&project_id) else {
            return false;
        };

        let removed = room.remove(&connection_id).is_some();
        let remaining = room.len();
        if remaining == 0 {
            registry.rooms.remove(&project_id);
        }

        if removed {
            info!(
                project_id = %project_id,
                connection_id = %connection_id,
                remaining,
                "[ROOM] LEAVE project={} remaining={}",
                project_id,
                remaining
            );
        }
        removed
    }

    /// Deliver `event` to every member of the room except `sender`.
    ///
    /// Returns the number of queues that accepted the event.
    pub async fn broadcast(&self, project_id: Uuid, sender: ConnectionId, event: &ServerEvent) -> usize {
        self.fan_out(project_id, Some(sender), event).await
    }

    /// Deliver `event` to every member of the room, sender included.
    pub async fn broadcast_all(&self, project_id: Uuid, event: &ServerEvent) -> usize {
        self.fan_out(project_id, None, event).await
    }

    /// Deliver `event` to one member only.
    pub async fn send_to(&self, project_id: Uuid, connection_id: ConnectionId, event: ServerEvent) -> bool {
        let registry = self.inner.read().await;
        registry
            .rooms
            .get(&project_id)
            .and_then(|room| room.get(&connection_id))
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    async fn fan_out(&self, project_id: Uuid, skip: Option<ConnectionId>, event: &ServerEvent) -> usize {
        let registry = self.inner.read().await;
        let Some(room) = registry.rooms.get(&project_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (id, tx) in room {
            if Some(*id) == skip {
                continue;
            }
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        debug!(
            project_id = %project_id,
            delivered,
            members = room.len(),
            "[ROOM] BROADCAST project={} delivered={}",
            project_id,
            delivered
        );
        delivered
    }

    /// Number of connections currently in the room of `project_id`.
    pub async fn member_count(&self, project_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(&project_id)
            .map_or(0, HashMap::len)
    }

    /// Number of non-empty rooms.
    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.len()
    }

    /// Drop every member queue and refuse further joins.
    pub async fn close(&self) {
        let mut registry = self.inner.write().await;
        let connections: usize = registry.rooms.values().map(HashMap::len).sum();
        registry.rooms.clear();
        registry.closed = true;
        info!(connections, "[ROOM] Room manager closed");
    }
}
