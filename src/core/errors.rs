// src/core/errors.rs

//! Defines the primary error type for the hub.

use super::ConnectionId;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within the hub.
///
/// Routing itself never surfaces these to clients: unknown receivers and
/// duplicate lifecycle events are not errors. These variants describe
/// transport and framing failures.
#[derive(Error, Debug, Clone)]
pub enum HubError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Unknown hub method '{0}'")]
    UnknownMethod(String),

    #[error("Binary frames are not supported")]
    BinaryFrame,

    #[error("No connected client with id '{0}'")]
    UnknownConnection(ConnectionId),

    #[error("Connection '{0}' is closed")]
    ConnectionClosed(ConnectionId),

    #[error("Outbound queue for connection '{0}' is full")]
    QueueFull(ConnectionId),
}

impl From<std::io::Error> for HubError {
    fn from(e: std::io::Error) -> Self {
        HubError::Io(Arc::new(e))
    }
}

impl From<axum::Error> for HubError {
    fn from(e: axum::Error) -> Self {
        HubError::Io(Arc::new(std::io::Error::other(e)))
    }
}
