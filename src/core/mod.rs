// src/core/mod.rs

//! The central module containing the hub's routing logic and shared state.

pub mod errors;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod state;
pub mod transport;

pub use errors::HubError;
pub use registry::{ConnectionId, ConnectionRegistry};
pub use router::MessageRouter;
pub use transport::{DeliveryReport, Transport};
