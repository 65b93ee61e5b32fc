// src/core/registry.rs

//! The process-wide connection registry.
//!
//! Maps each live connection to the username it supplied at connect time.
//! The registry owns its synchronization: callers never take a lock, and
//! register, unregister and lookup may run concurrently from any number of
//! connection tasks.

use dashmap::DashMap;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An opaque, transport-assigned identifier for one live realtime session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    /// Generates a fresh random identifier (a UUIDv4 in its 32-char simple form).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ConnectionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

/// `ConnectionRegistry` is the single source of truth for which connections
/// are open and under which username.
///
/// Entries are keyed by `ConnectionId`. Several entries may share a username
/// (one user with several tabs). A connection that supplied no username is
/// held as anonymous: it occupies an entry but no lookup ever returns it. An
/// explicitly empty username is an ordinary name and matches itself.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: DashMap<ConnectionId, Option<String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records `connection_id` as belonging to `username`.
    ///
    /// Registering an id that is already present keeps a single entry holding
    /// the most recent username. This never fails.
    pub fn register(&self, connection_id: impl Into<ConnectionId>, username: impl Into<String>) {
        self.insert(connection_id.into(), Some(username.into()));
    }

    /// Records `connection_id` without a username. It can never be a routing target.
    pub fn register_anonymous(&self, connection_id: impl Into<ConnectionId>) {
        self.insert(connection_id.into(), None);
    }

    fn insert(&self, connection_id: ConnectionId, username: Option<String>) {
        if let Some(previous) = self.entries.insert(connection_id.clone(), username.clone())
            && previous != username
        {
            debug!(
                "Connection {} re-registered: {:?} -> {:?}",
                connection_id, previous, username
            );
        }
    }

    /// Removes the entry for `connection_id`. Returns whether an entry was
    /// present; removing an absent id is a no-op.
    pub fn unregister(&self, connection_id: &str) -> bool {
        self.entries.remove(connection_id).is_some()
    }

    /// Returns every connection currently registered under exactly `username`.
    ///
    /// The result is a point-in-time snapshot. Registrations racing with the
    /// scan may or may not be included, but the scan never observes a torn entry.
    pub fn lookup_connections_by_username(&self, username: &str) -> Vec<ConnectionId> {
        self.entries
            .iter()
            .filter(|entry| entry.value().as_deref() == Some(username))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Returns the username registered for `connection_id`. `None` when the id
    /// is absent or anonymous.
    pub fn username_of(&self, connection_id: &str) -> Option<String> {
        self.entries.get(connection_id).and_then(|e| e.value().clone())
    }

    pub fn contains(&self, connection_id: &str) -> bool {
        self.entries.contains_key(connection_id)
    }

    /// Returns a copy of all entries.
    pub fn snapshot(&self) -> Vec<(ConnectionId, Option<String>)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
