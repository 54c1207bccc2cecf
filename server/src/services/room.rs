//! Room registry — table membership and serialized fan-out.
//!
//! DESIGN
//! ======
//! The registry maps `table_id` to a room. Each room sits behind its own
//! mutex: whoever holds it assigns the next timestamp and enqueues the frame
//! on every member's outbound channel before letting go, so all members see
//! one order per room. Different rooms never contend.
//!
//! LIFECYCLE
//! =========
//! Rooms are created on first join and dropped as soon as the last member
//! leaves. Membership changes hold the map write lock for their whole
//! duration, so a join can never land in a room that is being dropped.
//! Lock order is always map, then room.
//!
//! ERROR HANDLING
//! ==============
//! Enqueueing never blocks. A member whose channel is closed is evicted from
//! the room. A member whose channel is full only misses that frame and keeps
//! its seat; the action is still in history for a later backfill.

use std::collections::HashMap;
use std::sync::Arc;

use frames::Frame;
use frames::action::{ValidationError, validate_table_id};
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

/// One connection's seat in a room.
#[derive(Debug, Clone)]
pub struct Member {
    pub user_id: String,
    pub nickname: String,
    /// Outbound queue drained by the connection's socket loop.
    pub tx: mpsc::Sender<Frame>,
}

/// Snapshot of a member, without the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub connection_id: Uuid,
    pub user_id: String,
    pub nickname: String,
}

/// Entry of the active-table listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub table_id: String,
    pub members: usize,
}

/// Live state of a single table.
#[derive(Debug, Default)]
pub struct Room {
    members: HashMap<Uuid, Member>,
    last_timestamp: i64,
}

impl Room {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn contains(&self, connection_id: Uuid) -> bool {
        self.members.contains_key(&connection_id)
    }

    /// Next broadcast timestamp. Never earlier than the previous one, even
    /// if the wall clock steps back.
    pub fn next_timestamp(&mut self, now_ms: i64) -> i64 {
        let ts = now_ms.max(self.last_timestamp);
        self.last_timestamp = ts;
        ts
    }

    /// Enqueue `frame` for every member. Returns the connections evicted
    /// because their channel was closed.
    pub fn fan_out(&mut self, frame: &Frame) -> Vec<Uuid> {
        let mut evicted = Vec::new();
        for (connection_id, member) in &self.members {
            match member.tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(%connection_id, frame_id = %frame.id, "room: outbound queue full, frame skipped");
                }
                Err(TrySendError::Closed(_)) => evicted.push(*connection_id),
            }
        }
        for connection_id in &evicted {
            self.members.remove(connection_id);
        }
        evicted
    }

    fn snapshot(&self) -> Vec<MemberInfo> {
        self.members
            .iter()
            .map(|(connection_id, m)| MemberInfo {
                connection_id: *connection_id,
                user_id: m.user_id.clone(),
                nickname: m.nickname.clone(),
            })
            .collect()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

type RoomHandle = Arc<Mutex<Room>>;

/// Return the room for an already validated `table_id`, creating it if
/// needed. The caller holds the map write lock.
fn ensure_room(rooms: &mut HashMap<String, RoomHandle>, table_id: &str) -> RoomHandle {
    if let Some(handle) = rooms.get(table_id) {
        return handle.clone();
    }
    info!(%table_id, "room: created");
    let handle = RoomHandle::default();
    rooms.insert(table_id.to_owned(), handle.clone());
    handle
}

/// Shared table → room map. Cheap to clone.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat a connection in a room. Joining again replaces the seat.
    /// Returns the normalized table id.
    ///
    /// # Errors
    ///
    /// Rejects blank or malformed table ids.
    pub async fn join(&self, table_id: &str, connection_id: Uuid, member: Member) -> Result<String, ValidationError> {
        let table_id = validate_table_id(table_id)?;
        let mut rooms = self.rooms.write().await;
        let handle = ensure_room(&mut rooms, &table_id);
        let mut room = handle.lock().await;
        room.members.insert(connection_id, member);
        info!(%table_id, %connection_id, members = room.len(), "room: joined");
        Ok(table_id)
    }

    /// Remove a connection from a room. Drops the room once empty.
    /// Returns whether the connection was a member.
    pub async fn leave(&self, table_id: &str, connection_id: Uuid) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(handle) = rooms.get(table_id).cloned() else {
            return false;
        };
        let mut room = handle.lock().await;
        let was_member = room.members.remove(&connection_id).is_some();
        info!(%table_id, %connection_id, remaining = room.len(), "room: left");

        if room.is_empty() {
            drop(room);
            rooms.remove(table_id);
            info!(%table_id, "room: dropped empty room");
        }
        was_member
    }

    /// Drop a room if nobody is left in it, e.g. after fan-out evictions.
    pub async fn drop_if_empty(&self, table_id: &str) {
        let mut rooms = self.rooms.write().await;
        let Some(handle) = rooms.get(table_id).cloned() else {
            return;
        };
        if handle.lock().await.is_empty() {
            rooms.remove(table_id);
            warn!(%table_id, "room: dropped after evicting the last member");
        }
    }

    /// Handle to an existing room, for stamping and fan-out.
    pub async fn room(&self, table_id: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(table_id).cloned()
    }

    /// Current members of a room, in no particular order.
    pub async fn members(&self, table_id: &str) -> Vec<MemberInfo> {
        let Some(handle) = self.room(table_id).await else {
            return Vec::new();
        };
        handle.lock().await.snapshot()
    }

    /// Active tables with their member counts, sorted by table id.
    pub async fn tables(&self) -> Vec<TableSummary> {
        let rooms = self.rooms.read().await;
        let mut tables = Vec::with_capacity(rooms.len());
        for (table_id, handle) in rooms.iter() {
            let members = handle.lock().await.len();
            tables.push(TableSummary { table_id: table_id.clone(), members });
        }
        tables.sort_by(|a, b| a.table_id.cmp(&b.table_id));
        tables
    }

    #[cfg(test)]
    pub(crate) async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
