// src/core/protocol.rs

//! JSON frame formats exchanged over the hub's WebSocket endpoint.
//!
//! Clients invoke hub methods with `{"method": ..., "args": [...]}` and
//! receive named events as `{"event": ..., "args": ...}`.

use super::HubError;
use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};

/// The event name pushed to receivers of a private message.
pub const RECEIVE_PRIVATE_MESSAGE: &str = "ReceivePrivateMessage";

/// A frame that has already been encoded. Clones share one buffer, so it can
/// be queued to any number of connections and written out as-is.
pub type OutboundFrame = Utf8Bytes;

/// A method invocation sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "method", content = "args")]
pub enum ClientFrame {
    /// `(sender display name, message body, receiver username)`
    SendPrivateMessage(String, String, String),
}

impl ClientFrame {
    /// Parses a text frame received from a client.
    pub fn parse(text: &str) -> Result<Self, HubError> {
        #[derive(Deserialize)]
        struct Probe {
            method: Option<String>,
        }

        match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => Ok(frame),
            Err(e) => {
                // Distinguish a well-formed call to a method we don't expose from garbage.
                if let Ok(Probe {
                    method: Some(method),
                }) = serde_json::from_str::<Probe>(text)
                    && method != "SendPrivateMessage"
                {
                    return Err(HubError::UnknownMethod(method));
                }
                Err(HubError::InvalidFrame(e.to_string()))
            }
        }
    }
}

/// A named event pushed from the hub to a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "event", content = "args")]
pub enum HubEvent {
    /// `(sender display name, message body)`
    ReceivePrivateMessage(String, String),
    /// Sent only to the caller whose frame could not be handled.
    Error(String),
}

impl HubEvent {
    pub fn private_message(sender: &str, body: &str) -> Self {
        HubEvent::ReceivePrivateMessage(sender.to_string(), body.to_string())
    }

    /// Encodes the event into a frame ready to be queued.
    pub fn encode(&self) -> Result<OutboundFrame, HubError> {
        serde_json::to_string(self)
            .map(Utf8Bytes::from)
            .map_err(|e| HubError::Encode(e.to_string()))
    }
}
