//! Server-wide registry of live connections.
//!
//! `ConnectionRegistry` stores non-owning weak references to
//! [`Connection`]s. Ownership stays with the connection's own loops; the
//! registry lets the owner enumerate, look up and close connections without
//! keeping dead ones alive. A connection removes itself from the close path;
//! stale entries left by connections that were never started are pruned
//! lazily at lookup time.

use std::sync::{
    Arc,
    Weak,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;

use crate::connection::Connection;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier assigned to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Allocate the next process-unique identifier.
    #[must_use]
    pub fn next() -> Self { Self(NEXT_ID.fetch_add(1, Ordering::Relaxed)) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Concurrent registry of connections keyed by [`ConnectionId`].
#[derive(Default)]
pub struct ConnectionRegistry(DashMap<ConnectionId, Weak<Connection>>);

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Retrieve a connection by `id` if it is still alive.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        let guard = self.0.get(id);
        let conn = guard.as_ref().and_then(|weak| weak.upgrade());
        drop(guard);
        if conn.is_none() {
            self.0.remove_if(id, |_, weak| weak.strong_count() == 0);
        }
        conn
    }

    /// Insert a newly started connection.
    pub fn insert(&self, conn: &Arc<Connection>) { self.0.insert(conn.id(), Arc::downgrade(conn)); }

    /// Remove a connection, typically on teardown.
    pub fn remove(&self, id: &ConnectionId) { self.0.remove(id); }

    /// Number of entries, including any not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Returns `true` if no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Remove all stale weak references.
    ///
    /// `DashMap::retain` acquires per-bucket write locks, so other operations
    /// may contend briefly while the registry is pruned.
    pub fn prune(&self) { self.0.retain(|_, weak| weak.strong_count() > 0); }

    /// Prune stale weak references, then return the IDs of the live connections.
    #[must_use]
    pub fn active_ids(&self) -> Vec<ConnectionId> {
        let mut ids = Vec::with_capacity(self.0.len());
        self.0.retain(|id, weak| {
            if weak.strong_count() > 0 {
                ids.push(*id);
                true
            } else {
                false
            }
        });
        ids
    }

    /// Close every live connection.
    ///
    /// Handles are collected first so no registry lock is held while a
    /// connection's close path removes its own entry.
    pub fn close_all(&self) {
        let live: Vec<Arc<Connection>> = self.0.iter().filter_map(|e| e.value().upgrade()).collect();
        for conn in live {
            conn.close();
        }
    }
}
