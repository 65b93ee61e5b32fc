// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a hub connection.

use super::guard::ConnectionGuard;
use super::session::SessionState;
use crate::core::protocol::{ClientFrame, HubEvent, OutboundFrame};
use crate::core::state::{ClientHandle, ServerState};
use crate::core::{ConnectionId, HubError, metrics};
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, broadcast, mpsc};
use tracing::{debug, info, warn};

/// Manages the full lifecycle of a WebSocket client attached to the hub.
pub struct ConnectionHandler {
    socket: WebSocket,
    addr: SocketAddr,
    state: Arc<ServerState>,
    session: SessionState,
    outbound_rx: mpsc::Receiver<OutboundFrame>,
    shutdown_rx: broadcast::Receiver<()>,
    global_shutdown_rx: broadcast::Receiver<()>,
    _guard: ConnectionGuard,
    // Declared after the guard so the slot is released only once the entry is gone.
    _permit: OwnedSemaphorePermit,
}

impl ConnectionHandler {
    /// Attaches a freshly upgraded socket to the hub.
    ///
    /// This is the connect hook: it assigns a connection id, publishes the
    /// client's outbound queue, and registers `username` in the registry.
    /// A connection without a username is registered as anonymous.
    pub fn connect(
        socket: WebSocket,
        addr: SocketAddr,
        state: Arc<ServerState>,
        username: Option<String>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        let connection_id = ConnectionId::generate();
        let (outbound, outbound_rx) = mpsc::channel(state.config.outbound_queue_capacity);
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let global_shutdown_rx = state.shutdown_tx.subscribe();

        state.clients.insert(
            connection_id.clone(),
            ClientHandle {
                outbound,
                shutdown,
            },
        );
        match &username {
            Some(name) => state.registry.register(connection_id.clone(), name.as_str()),
            None => state.registry.register_anonymous(connection_id.clone()),
        }

        metrics::CONNECTIONS_RECEIVED_TOTAL.inc();
        state.stats.record_connection(state.clients.len());
        state.refresh_gauges();
        info!(
            "Connection {} registered as '{}' from {}.",
            connection_id,
            username.as_deref().unwrap_or("<anonymous>"),
            addr
        );

        let guard = ConnectionGuard::new(state.clone(), connection_id.clone(), addr);
        Self {
            socket,
            addr,
            state,
            session: SessionState::new(connection_id, username),
            outbound_rx,
            shutdown_rx,
            global_shutdown_rx,
            _guard: guard,
            _permit: permit,
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.session.connection_id
    }

    /// The main event loop for the connection.
    ///
    /// Consumes the handler; the disconnect hook runs when it returns,
    /// whatever the outcome.
    pub async fn run(mut self) -> Result<(), HubError> {
        loop {
            tokio::select! {
                // Prioritize shutdown signals over other events.
                biased;
                _ = self.global_shutdown_rx.recv() => {
                    info!("Connection {} received GLOBAL shutdown signal.", self.session.connection_id);
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: Utf8Bytes::from_static("Server is shutting down"),
                    };
                    let _ = self.socket.send(Message::Close(Some(frame))).await;
                    break;
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Connection {} received kill signal.", self.session.connection_id);
                    let _ = self.socket.send(Message::Close(None)).await;
                    break;
                }
                Some(frame) = self.outbound_rx.recv() => {
                    self.socket.send(Message::Text(frame)).await?;
                }
                result = self.socket.recv() => {
                    match result {
                        Some(Ok(message)) => {
                            if !self.process_message(message).await? {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            warn!("Connection error for {} ({}): {}", self.session.connection_id, self.addr, e);
                            break;
                        }
                        None => {
                            debug!("Connection {} closed by peer.", self.session.connection_id);
                            break;
                        }
                    }
                }
            }
        }

        let who = self.session.username.as_deref().unwrap_or("<anonymous>");
        debug!(
            "Session {} ({}) ended after {:?}: {} frames received, {} messages sent.",
            self.session.connection_id,
            who,
            self.session.connected_at.elapsed(),
            self.session.frames_received,
            self.session.messages_sent
        );
        Ok(())
    }

    /// Handles one inbound WebSocket message. Returns `false` when the session should end.
    async fn process_message(&mut self, message: Message) -> Result<bool, HubError> {
        match message {
            Message::Text(text) => {
                self.session.frames_received += 1;
                if let Err(e) = self.process_frame(text.as_str()) {
                    self.send_error_to_client(e).await?;
                }
                Ok(true)
            }
            Message::Binary(_) => {
                self.session.frames_received += 1;
                self.send_error_to_client(HubError::BinaryFrame).await?;
                Ok(true)
            }
            // Pongs are queued by the WebSocket layer itself.
            Message::Ping(_) | Message::Pong(_) => Ok(true),
            Message::Close(_) => {
                debug!("Connection {} requested close.", self.session.connection_id);
                Ok(false)
            }
        }
    }

    /// Parses a text frame and invokes the requested hub method.
    fn process_frame(&mut self, text: &str) -> Result<(), HubError> {
        match ClientFrame::parse(text)? {
            ClientFrame::SendPrivateMessage(user, message, receiver) => {
                debug!(
                    "Session {}: SendPrivateMessage from '{}' to '{}'",
                    self.session.connection_id, user, receiver
                );
                self.session.messages_sent += 1;
                self.state.send_private_message(&user, &message, &receiver);
                Ok(())
            }
        }
    }

    /// Sends an `Error` event to this client only.
    async fn send_error_to_client(&mut self, error: HubError) -> Result<(), HubError> {
        debug!(
            "Session {}: rejecting frame: {}",
            self.session.connection_id, error
        );
        let frame = HubEvent::Error(error.to_string()).encode()?;
        self.socket
            .send(Message::Text(frame))
            .await?;
        Ok(())
    }
}
