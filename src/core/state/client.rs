// src/core/state/client.rs

//! Contains state definitions related to client connections.

use crate::core::protocol::OutboundFrame;
use crate::core::transport::Transport;
use crate::core::{ConnectionId, HubError};
use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};

pub type ShutdownSender = broadcast::Sender<()>;

/// Everything the rest of the server needs to reach one connected client.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    /// The client's bounded outbound queue, drained by its connection task.
    pub outbound: mpsc::Sender<OutboundFrame>,
    /// Fires to terminate this one connection.
    pub shutdown: ShutdownSender,
}

/// The table of connected WebSocket clients, keyed by connection id.
///
/// This is the production `Transport`: a push looks up the client's queue
/// and enqueues without waiting.
#[derive(Debug, Default)]
pub struct ConnectedClients {
    clients: DashMap<ConnectionId, ClientHandle>,
}

impl ConnectedClients {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&self, connection_id: ConnectionId, handle: ClientHandle) {
        self.clients.insert(connection_id, handle);
    }

    pub fn remove(&self, connection_id: &str) -> Option<ClientHandle> {
        self.clients.remove(connection_id).map(|(_, handle)| handle)
    }

    pub fn get(&self, connection_id: &str) -> Option<ClientHandle> {
        self.clients.get(connection_id).map(|e| e.value().clone())
    }

    /// Signals every connected client to close.
    pub fn kill_all(&self) -> usize {
        self.clients
            .iter()
            .filter(|e| e.value().shutdown.send(()).is_ok())
            .count()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Transport for ConnectedClients {
    fn send(&self, connection_id: &ConnectionId, frame: OutboundFrame) -> Result<(), HubError> {
        // Clone the sender out so the shard lock is not held across the push.
        let outbound = self
            .clients
            .get(connection_id.as_str())
            .map(|e| e.value().outbound.clone())
            .ok_or_else(|| HubError::UnknownConnection(connection_id.clone()))?;

        outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => HubError::QueueFull(connection_id.clone()),
            TrySendError::Closed(_) => HubError::ConnectionClosed(connection_id.clone()),
        })
    }
}
