// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared hub-wide state.

use super::client::ConnectedClients;
use super::stats::StatsState;
use crate::config::Config;
use crate::core::metrics;
use crate::core::registry::ConnectionRegistry;
use crate::core::router::MessageRouter;
use crate::core::transport::DeliveryReport;
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tracing::info;

/// The central struct holding all shared, hub-wide state.
///
/// Created once at startup, wrapped in an `Arc`, and handed to the HTTP
/// routes and every connection handler. It lives for the whole process.
#[derive(Debug)]
pub struct ServerState {
    /// The resolved configuration. Read-only after startup.
    pub config: Config,
    /// Connection id -> username. The only shared mutable routing state.
    pub registry: Arc<ConnectionRegistry>,
    /// Connection id -> outbound queue and kill switch for every open socket.
    pub clients: Arc<ConnectedClients>,
    /// Resolves receivers through `registry` and pushes through `clients`.
    pub router: MessageRouter<ConnectedClients>,
    /// Bounds the number of concurrently open sessions to `max_clients`.
    pub connection_permits: Arc<Semaphore>,
    /// Fires once when the server begins shutting down.
    pub shutdown_tx: broadcast::Sender<()>,
    pub stats: StatsState,
}

impl ServerState {
    /// Builds the shared state from a validated configuration.
    pub fn initialize(config: Config) -> Arc<Self> {
        let registry = Arc::new(ConnectionRegistry::new());
        let clients = Arc::new(ConnectedClients::new());
        let router = MessageRouter::new(registry.clone(), clients.clone());
        let connection_permits = Arc::new(Semaphore::new(config.max_clients));
        let (shutdown_tx, _) = broadcast::channel(1);
        info!(
            "Hub state initialized (max_clients={}, outbound_queue_capacity={}).",
            config.max_clients, config.outbound_queue_capacity
        );

        Arc::new(Self {
            config,
            registry,
            clients,
            router,
            connection_permits,
            shutdown_tx,
            stats: StatsState::new(),
        })
    }

    /// The hub's one exposed action: deliver `body` from `sender_name` to every
    /// live connection of `receiver_username`. Fire-and-forget.
    pub fn send_private_message(
        &self,
        sender_name: &str,
        body: &str,
        receiver_username: &str,
    ) -> DeliveryReport {
        self.stats.increment_total_messages();
        self.router
            .route_private_message(sender_name, body, receiver_username)
    }

    /// Refreshes gauges that are derived from live state.
    pub fn refresh_gauges(&self) {
        metrics::CONNECTED_CLIENTS.set(self.clients.len() as f64);
        metrics::REGISTERED_CONNECTIONS.set(self.registry.len() as f64);
    }
}
