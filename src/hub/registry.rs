//! Connection Registry
//!
//! Tracks the set of open dashboard connections. Membership changes are
//! mutually exclusive with enumeration; enumeration hands back an
//! independent copy so no lock is held while frames are being sent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use super::connection::{ConnectionHandle, ConnectionId};
use super::error::HubError;

/// Configuration for the connection registry
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Frames a connection may have queued before it is dropped
    pub queue_capacity: usize,
    /// Longest a single frame write may take before the connection is dropped
    pub write_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            queue_capacity: 32,
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// The set of currently open connections
pub struct ConnectionRegistry {
    /// Active connections: ConnectionId → ConnectionHandle
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Cleared once shutdown starts; only changed under the write lock
    accepting: AtomicBool,
    config: HubConfig,
}

impl ConnectionRegistry {
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            accepting: AtomicBool::new(true),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a connection
    ///
    /// Registering an id that is already present replaces the entry, so a
    /// connection never appears twice.
    pub async fn register(&self, handle: ConnectionHandle) -> Result<ConnectionId, HubError> {
        let id = handle.id();
        let mut connections = self.connections.write().await;

        if !self.accepting.load(Ordering::Acquire) {
            return Err(HubError::ShuttingDown);
        }
        if !connections.contains_key(&id) && connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }
        connections.insert(id, handle);
        let total = connections.len();
        drop(connections);

        tracing::info!(connection_id = %id, total, "Dashboard connected");
        Ok(id)
    }

    /// Remove a connection
    ///
    /// Idempotent: returns `false` and does nothing if the connection was
    /// already removed.
    pub async fn unregister(&self, id: &ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(id).is_some();
        if removed {
            tracing::info!(connection_id = %id, "Dashboard disconnected");
        }
        removed
    }

    /// Point-in-time copy of the current members
    pub async fn snapshot_members(&self) -> Vec<ConnectionHandle> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Refuse further registrations and return the final member list
    ///
    /// Any connection not in the returned list is guaranteed to be turned
    /// away by [`register`](Self::register).
    pub async fn stop_accepting(&self) -> Vec<ConnectionHandle> {
        let connections = self.connections.write().await;
        self.accepting.store(false, Ordering::Release);
        connections.values().cloned().collect()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Whether a connection is currently registered
    pub async fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.max_connections, 1000);
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let registry = ConnectionRegistry::default();
        let (handle, _queue) = ConnectionHandle::new();

        let id = registry.register(handle).await.unwrap();
        assert_eq!(registry.connection_count().await, 1);
        assert!(registry.contains(&id).await);

        assert!(registry.unregister(&id).await);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::default();
        let (a, _qa) = ConnectionHandle::new();
        let (b, _qb) = ConnectionHandle::new();
        registry.register(a.clone()).await.unwrap();
        registry.register(b.clone()).await.unwrap();

        assert!(registry.unregister(&a.id()).await);
        assert!(!registry.unregister(&a.id()).await);

        let members = registry.snapshot_members().await;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id(), b.id());
    }

    #[tokio::test]
    async fn test_register_twice_keeps_single_entry() {
        let registry = ConnectionRegistry::default();
        let (handle, _queue) = ConnectionHandle::new();

        registry.register(handle.clone()).await.unwrap();
        registry.register(handle.clone()).await.unwrap();

        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let registry = ConnectionRegistry::new(HubConfig {
            max_connections: 2,
            ..Default::default()
        });

        let (a, _qa) = ConnectionHandle::new();
        let (b, _qb) = ConnectionHandle::new();
        let (c, _qc) = ConnectionHandle::new();

        registry.register(a.clone()).await.unwrap();
        registry.register(b).await.unwrap();
        let result = registry.register(c).await;
        assert!(matches!(result, Err(HubError::TooManyConnections(2))));

        // Re-registering an existing member is not a new connection
        assert!(registry.register(a).await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_accepting_turns_away_late_connections() {
        let registry = ConnectionRegistry::default();
        let (a, _qa) = ConnectionHandle::new();
        registry.register(a.clone()).await.unwrap();

        let members = registry.stop_accepting().await;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id(), a.id());
        assert!(!registry.is_accepting());

        let (late, _ql) = ConnectionHandle::new();
        assert_eq!(registry.register(late).await, Err(HubError::ShuttingDown));
        assert_eq!(registry.connection_count().await, 1);

        // Members can still leave
        assert!(registry.unregister(&a.id()).await);
    }

    #[tokio::test]
    async fn test_snapshot_is_independent_copy() {
        let registry = ConnectionRegistry::default();
        let (a, _qa) = ConnectionHandle::new();
        registry.register(a.clone()).await.unwrap();

        let members = registry.snapshot_members().await;
        registry.unregister(&a.id()).await;
        let (b, _qb) = ConnectionHandle::new();
        registry.register(b).await.unwrap();

        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id(), a.id());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_unregister() {
        let registry = Arc::new(ConnectionRegistry::default());
        let mut tasks = Vec::new();

        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                for _ in 0..25 {
                    let (handle, _queue) = ConnectionHandle::new();
                    let id = handle.id();
                    registry.register(handle).await.unwrap();

                    let members = registry.snapshot_members().await;
                    let unique: HashSet<_> = members.iter().map(|m| m.id()).collect();
                    assert_eq!(unique.len(), members.len());

                    registry.unregister(&id).await;
                    let after = registry.snapshot_members().await;
                    assert!(after.iter().all(|m| m.id() != id));
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.connection_count().await, 0);
    }
}
