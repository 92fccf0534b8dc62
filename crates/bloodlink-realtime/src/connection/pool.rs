//! All live connections, indexed by id and by user.

use std::sync::Arc;

use dashmap::DashMap;

use bloodlink_core::types::UserId;

use super::handle::{ConnectionHandle, ConnectionId};

/// Thread-safe pool of active connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle.clone());
        self.by_user.entry(handle.user_id).or_default().push(handle);
    }

    /// Remove a connection.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        if let Some(mut connections) = self.by_user.get_mut(&handle.user_id) {
            connections.retain(|c| c.id != *conn_id);
            if connections.is_empty() {
                drop(connections);
                self.by_user.remove(&handle.user_id);
            }
        }
        Some(handle)
    }

    /// A connection by id.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Every connection a user has open.
    pub fn user_connections(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of connections a user has open.
    pub fn user_connection_count(&self, user_id: &UserId) -> usize {
        self.by_user.get(user_id).map(|e| e.len()).unwrap_or(0)
    }

    /// Total live connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Snapshot of every connection.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id.iter().map(|e| e.value().clone()).collect()
    }
}
