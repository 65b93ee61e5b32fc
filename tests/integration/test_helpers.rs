// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

use chathub::config::Config;
use chathub::core::ConnectionId;
use chathub::core::protocol::{HubEvent, OutboundFrame};
use chathub::core::state::{ClientHandle, ServerState};
use chathub::server::{HubListener, PeerAddr, routes};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub type ClientSocket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// TestContext provides a hub state with in-memory clients attached directly
/// to the transport table, without any sockets.
pub struct TestContext {
    pub state: Arc<ServerState>,
}

/// A client attached to a `TestContext`; frames routed to it land in `rx`.
pub struct FakeClient {
    pub connection_id: ConnectionId,
    pub rx: mpsc::Receiver<OutboundFrame>,
}

impl FakeClient {
    /// Drains every frame queued so far and decodes them.
    pub fn drain(&mut self) -> Vec<HubEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            events.push(serde_json::from_str(frame.as_str()).expect("hub sent invalid JSON"));
        }
        events
    }
}

impl TestContext {
    /// Creates a new test context with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new test context with custom configuration
    pub fn with_config(config: Config) -> Self {
        init_tracing();
        Self {
            state: ServerState::initialize(config),
        }
    }

    /// Runs the connect hook for a fake client: publishes its queue and registers it.
    pub fn connect(&self, connection_id: &str, username: &str) -> FakeClient {
        let client = self.attach(connection_id);
        self.state
            .registry
            .register(client.connection_id.clone(), username);
        client
    }

    /// Runs the connect hook for a fake client that supplied no username.
    pub fn connect_anonymous(&self, connection_id: &str) -> FakeClient {
        let client = self.attach(connection_id);
        self.state
            .registry
            .register_anonymous(client.connection_id.clone());
        client
    }

    fn attach(&self, connection_id: &str) -> FakeClient {
        let connection_id = ConnectionId::from(connection_id);
        let (outbound, rx) = mpsc::channel(self.state.config.outbound_queue_capacity);
        let (shutdown, _) = broadcast::channel(1);
        self.state
            .clients
            .insert(connection_id.clone(), ClientHandle { outbound, shutdown });
        FakeClient { connection_id, rx }
    }

    /// Runs the disconnect hook for a fake client.
    pub fn disconnect(&self, connection_id: &str) {
        self.state.registry.unregister(connection_id);
        self.state.clients.remove(connection_id);
    }
}

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("warn"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// A hub served on an ephemeral local port.
pub struct TestServer {
    pub state: Arc<ServerState>,
    pub addr: SocketAddr,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(Config::default()).await
    }

    pub async fn start_with(config: Config) -> Self {
        init_tracing();
        let state = ServerState::initialize(config);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = routes::router(state.clone());
        let mut shutdown_rx = state.shutdown_tx.subscribe();
        tokio::spawn(async move {
            axum::serve(
                HubListener::plain(listener),
                app.into_make_service_with_connect_info::<PeerAddr>(),
            )
            .with_graceful_shutdown(async move {
                shutdown_rx.recv().await.ok();
            })
            .await
            .unwrap();
        });
        Self { state, addr }
    }

    pub fn hub_url(&self, username: Option<&str>) -> String {
        let base = format!("ws://{}{}", self.addr, self.state.config.hub_path);
        match username {
            Some(name) => format!("{base}?username={name}"),
            None => base,
        }
    }

    /// Connects a WebSocket client and waits until the hub has registered it.
    pub async fn connect(&self, username: &str) -> ClientSocket {
        let before = self.state.registry.len();
        let (socket, _) = tokio_tungstenite::connect_async(self.hub_url(Some(username)))
            .await
            .expect("handshake failed");
        self.wait_for_registered(before + 1).await;
        socket
    }

    /// Polls until the registry holds exactly `count` entries.
    pub async fn wait_for_registered(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.state.registry.len() != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "registry has {} entries, expected {}",
                self.state.registry.len(),
                count
            )
        });
    }

    pub fn shutdown(&self) {
        let _ = self.state.shutdown_tx.send(());
    }
}

/// Sends a `SendPrivateMessage` invocation.
pub async fn send_private_message(socket: &mut ClientSocket, user: &str, message: &str, receiver: &str) {
    let frame = serde_json::json!({
        "method": "SendPrivateMessage",
        "args": [user, message, receiver],
    });
    socket
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

/// Waits for the next hub event on `socket`, skipping control frames.
pub async fn next_event(socket: &mut ClientSocket) -> Option<HubEvent> {
    let deadline = Duration::from_secs(2);
    loop {
        let message = tokio::time::timeout(deadline, socket.next()).await.ok()??;
        match message.ok()? {
            Message::Text(text) => {
                return Some(serde_json::from_str(text.as_str()).expect("hub sent invalid JSON"));
            }
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

/// Asserts that no hub event arrives on `socket` within a short window.
pub async fn assert_no_event(socket: &mut ClientSocket) {
    let result = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
    if let Ok(Some(Ok(Message::Text(text)))) = result {
        panic!("unexpected event: {}", text.as_str());
    }
}
