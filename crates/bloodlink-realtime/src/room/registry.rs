//! Room registry: room → members, with a reverse index per connection.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::ConnectionId;

/// Registry of rooms and their member connections.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, HashSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, HashSet<String>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Returns `false` if it was already in.
    pub fn join(&self, room: &str, conn_id: ConnectionId) -> bool {
        let added = self
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn_id);
        self.memberships
            .entry(conn_id)
            .or_default()
            .insert(room.to_string());
        added
    }

    /// Remove a connection from a room.
    pub fn leave(&self, room: &str, conn_id: ConnectionId) -> bool {
        let removed = self.remove_member(room, conn_id);
        if let Some(mut rooms) = self.memberships.get_mut(&conn_id) {
            rooms.remove(room);
            if rooms.is_empty() {
                drop(rooms);
                self.memberships.remove(&conn_id);
            }
        }
        removed
    }

    /// Remove a connection from every room.
    pub fn leave_all(&self, conn_id: ConnectionId) {
        if let Some((_, rooms)) = self.memberships.remove(&conn_id) {
            for room in &rooms {
                self.remove_member(room, conn_id);
            }
        }
    }

    fn remove_member(&self, room: &str, conn_id: ConnectionId) -> bool {
        let Some(mut members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&conn_id);
        if members.is_empty() {
            drop(members);
            self.rooms.remove(room);
        }
        removed
    }

    /// Current members of a room.
    pub fn members(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rooms a connection is in.
    pub fn room_count(&self, conn_id: ConnectionId) -> usize {
        self.memberships.get(&conn_id).map(|r| r.len()).unwrap_or(0)
    }

    /// Rooms with at least one member.
    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_join_leave_cleans_up() {
        let registry = RoomRegistry::new();
        let conn = Uuid::new_v4();
        assert!(registry.join("request:1", conn));
        assert!(!registry.join("request:1", conn));
        assert_eq!(registry.members("request:1"), vec![conn]);

        assert!(registry.leave("request:1", conn));
        assert_eq!(registry.active_rooms(), 0);
        assert_eq!(registry.room_count(conn), 0);
    }

    #[test]
    fn test_leave_all() {
        let registry = RoomRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        registry.join("user:a", a);
        registry.join("request:1", a);
        registry.join("request:1", b);

        registry.leave_all(a);
        assert_eq!(registry.members("request:1"), vec![b]);
        assert!(registry.members("user:a").is_empty());
    }
}
