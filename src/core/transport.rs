// src/core/transport.rs

//! The boundary through which the router pushes events to connections.

use super::protocol::OutboundFrame;
use super::{ConnectionId, HubError};
use tracing::warn;

/// The outcome of a multi-target push. Informational only: delivery is
/// fire-and-forget and nothing is retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// The number of connections the frame was addressed to.
    pub targeted: usize,
    /// The number of connections whose outbound queue accepted the frame.
    pub delivered: usize,
    /// The number of connections that could not take the frame.
    pub failed: usize,
}

/// A realtime transport that can push an encoded frame to connections by id.
///
/// Implementations must not block: a push either enqueues immediately or fails.
pub trait Transport: Send + Sync {
    /// Pushes `frame` to a single connection.
    fn send(&self, connection_id: &ConnectionId, frame: OutboundFrame) -> Result<(), HubError>;

    /// Pushes `frame` to each of `connection_ids` independently.
    ///
    /// A failure for one target never prevents attempts on the others.
    fn send_many(&self, connection_ids: &[ConnectionId], frame: OutboundFrame) -> DeliveryReport {
        let mut report = DeliveryReport {
            targeted: connection_ids.len(),
            ..Default::default()
        };
        for connection_id in connection_ids {
            match self.send(connection_id, frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Failed to push frame to {}: {}", connection_id, e);
                    report.failed += 1;
                }
            }
        }
        report
    }
}
