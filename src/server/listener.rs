// src/server/listener.rs

//! The hub's accepting socket, optionally terminating TLS.

use super::stream::HubStream;
use axum::extract::connect_info::Connected;
use axum::serve::{IncomingStream, Listener};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, warn};

/// The number of completed TLS handshakes that may wait for the HTTP layer.
const HANDSHAKE_QUEUE_CAPACITY: usize = 128;

/// The peer address of an accepted connection, exposed to handlers via `ConnectInfo`.
#[derive(Debug, Clone, Copy)]
pub struct PeerAddr(pub SocketAddr);

impl Connected<IncomingStream<'_, HubListener>> for PeerAddr {
    fn connect_info(stream: IncomingStream<'_, HubListener>) -> Self {
        PeerAddr(*stream.remote_addr())
    }
}

/// A listener yielding plain TCP or TLS streams.
///
/// In TLS mode, handshakes run on their own tasks so a stalled peer never
/// holds up other clients; finished streams are handed over through a queue.
pub enum HubListener {
    Plain(TcpListener),
    Tls {
        incoming: mpsc::Receiver<(HubStream, SocketAddr)>,
        local_addr: SocketAddr,
        acceptor_task: JoinHandle<()>,
    },
}

impl HubListener {
    pub fn plain(listener: TcpListener) -> Self {
        HubListener::Plain(listener)
    }

    /// Wraps `listener` so that every accepted socket completes a TLS handshake
    /// within `handshake_timeout` before it is handed to the HTTP layer.
    pub fn tls(
        listener: TcpListener,
        acceptor: TlsAcceptor,
        handshake_timeout: Duration,
    ) -> std::io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let (tx, incoming) = mpsc::channel(HANDSHAKE_QUEUE_CAPACITY);
        let acceptor_task = tokio::spawn(run_tls_acceptor(
            listener,
            acceptor,
            handshake_timeout,
            tx,
        ));
        Ok(HubListener::Tls {
            incoming,
            local_addr,
            acceptor_task,
        })
    }
}

impl Drop for HubListener {
    fn drop(&mut self) {
        if let HubListener::Tls { acceptor_task, .. } = self {
            acceptor_task.abort();
        }
    }
}

impl Listener for HubListener {
    type Io = HubStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        match self {
            HubListener::Plain(listener) => loop {
                // Inherent accept, not this trait's.
                match TcpListener::accept(listener).await {
                    Ok((socket, addr)) => return (HubStream::Plain(socket), addr),
                    Err(e) => handle_accept_error(e).await,
                }
            },
            HubListener::Tls { incoming, .. } => match incoming.recv().await {
                Some(accepted) => accepted,
                // The acceptor task only ends on shutdown; never yield again.
                None => std::future::pending().await,
            },
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        match self {
            HubListener::Plain(listener) => listener.local_addr(),
            HubListener::Tls { local_addr, .. } => Ok(*local_addr),
        }
    }
}

async fn run_tls_acceptor(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
    tx: mpsc::Sender<(HubStream, SocketAddr)>,
) {
    while !tx.is_closed() {
        let (socket, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                handle_accept_error(e).await;
                continue;
            }
        };
        let acceptor = acceptor.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(handshake_timeout, acceptor.accept(socket)).await {
                Ok(Ok(tls_stream)) => {
                    debug!("TLS handshake successful for {addr}");
                    let _ = tx.send((HubStream::Tls(Box::new(tls_stream)), addr)).await;
                }
                Ok(Err(e)) => warn!("TLS handshake error for {addr}: {e}"),
                Err(_) => warn!("TLS handshake with {addr} timed out"),
            }
        });
    }
}

/// Per-connection errors are skipped; anything else (e.g. fd exhaustion) backs off briefly.
async fn handle_accept_error(e: std::io::Error) {
    use std::io::ErrorKind;
    if matches!(
        e.kind(),
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
    ) {
        return;
    }
    error!("Failed to accept connection: {}", e);
    tokio::time::sleep(Duration::from_secs(1)).await;
}
