// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard that implements the disconnect hook.

use crate::core::ConnectionId;
use crate::core::state::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Unregisters a connection when dropped.
///
/// The guard lives inside the connection handler, so every way a session can
/// end (clean close, protocol or I/O error, server shutdown, a panic in the
/// handler task) removes its registry entry and its outbound queue.
pub struct ConnectionGuard {
    pub(crate) state: Arc<ServerState>,
    pub(crate) connection_id: ConnectionId,
    pub(crate) addr: SocketAddr,
}

impl ConnectionGuard {
    pub(crate) fn new(state: Arc<ServerState>, connection_id: ConnectionId, addr: SocketAddr) -> Self {
        Self {
            state,
            connection_id,
            addr,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        // Registry first: once the entry is gone no new route can target this id.
        if self.state.registry.unregister(self.connection_id.as_str()) {
            info!("Connection {} from {} disconnected.", self.connection_id, self.addr);
        } else {
            debug!(
                "Connection {} from {} was not in the registry upon cleanup.",
                self.connection_id, self.addr
            );
        }
        self.state.clients.remove(self.connection_id.as_str());
        self.state.refresh_gauges();
    }
}
