// src/connection/session.rs

//! Defines the state associated with a single client session.

use crate::core::ConnectionId;
use std::time::Instant;

/// Holds the state specific to a single client session.
#[derive(Debug)]
pub struct SessionState {
    pub connection_id: ConnectionId,
    /// The username supplied at connect time. `None` for anonymous sessions.
    pub username: Option<String>,
    /// The number of frames received from the client.
    pub frames_received: u64,
    /// The number of private messages this client has sent.
    pub messages_sent: u64,
    pub connected_at: Instant,
}

impl SessionState {
    pub(crate) fn new(connection_id: ConnectionId, username: Option<String>) -> Self {
        Self {
            connection_id,
            username,
            frames_received: 0,
            messages_sent: 0,
            connected_at: Instant::now(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }
}
