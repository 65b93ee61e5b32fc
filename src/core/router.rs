// src/core/router.rs

//! Routes private messages to every live connection of a named receiver.

use super::metrics;
use super::protocol::HubEvent;
use super::registry::ConnectionRegistry;
use super::transport::{DeliveryReport, Transport};
use std::sync::Arc;
use tracing::{debug, error};

/// `MessageRouter` resolves a receiver's connections through the registry
/// and pushes the message to exactly those connections.
#[derive(Debug)]
pub struct MessageRouter<T> {
    registry: Arc<ConnectionRegistry>,
    transport: Arc<T>,
}

impl<T> Clone for MessageRouter<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<T: Transport> MessageRouter<T> {
    pub fn new(registry: Arc<ConnectionRegistry>, transport: Arc<T>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Delivers `body` from `sender_name` to all live connections of
    /// `receiver_username`.
    ///
    /// An unknown receiver resolves to zero targets and the call is a silent
    /// no-op. Delivery is fire-and-forget: no acknowledgement, no retry.
    pub fn route_private_message(
        &self,
        sender_name: &str,
        body: &str,
        receiver_username: &str,
    ) -> DeliveryReport {
        let _timer = metrics::ROUTE_LATENCY_SECONDS.start_timer();
        metrics::PRIVATE_MESSAGES_ROUTED_TOTAL.inc();

        let targets = self
            .registry
            .lookup_connections_by_username(receiver_username);
        if targets.is_empty() {
            debug!(
                "No live connections for '{}'; dropping message from '{}'.",
                receiver_username, sender_name
            );
            return DeliveryReport::default();
        }

        // Encode once; every target shares the same frame.
        let frame = match HubEvent::private_message(sender_name, body).encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode private message: {}", e);
                return DeliveryReport {
                    targeted: targets.len(),
                    delivered: 0,
                    failed: targets.len(),
                };
            }
        };

        let report = self.transport.send_many(&targets, frame);
        metrics::DELIVERIES_TOTAL.inc_by(report.delivered as f64);
        metrics::DELIVERY_FAILURES_TOTAL.inc_by(report.failed as f64);
        debug!(
            "Routed message from '{}' to '{}': {}/{} connections.",
            sender_name, receiver_username, report.delivered, report.targeted
        );
        report
    }
}
