// src/server/initialization.rs

//! Handles the server initialization process: state setup, TLS, and the listener.

use super::context::ServerContext;
use super::listener::HubListener;
use crate::config::Config;
use crate::core::state::ServerState;
use anyhow::{Context, Result, anyhow};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_rustls::{TlsAcceptor, rustls};
use tracing::info;

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);

    let acceptor = setup_tls(&config)?;
    let server_state = ServerState::initialize(config);

    let config = &server_state.config;
    let tcp_listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;

    let listener = match acceptor {
        Some(acceptor) => HubListener::tls(
            tcp_listener,
            acceptor,
            Duration::from_secs(config.tls.handshake_timeout_secs),
        )?,
        None => HubListener::plain(tcp_listener),
    };
    let scheme = if config.tls.enabled { "wss" } else { "ws" };
    info!(
        "ChatHub listening on {}://{}:{}{}",
        scheme, config.host, config.port, config.hub_path
    );

    Ok(ServerContext {
        state: server_state,
        listener,
        background_tasks: JoinSet::new(),
    })
}

/// Sets up the TLS acceptor if TLS is enabled in the configuration.
fn setup_tls(config: &Config) -> Result<Option<TlsAcceptor>> {
    if config.tls.enabled {
        info!("TLS is enabled. Loading certificate and key.");
        let certs = load_certs(&config.tls.cert_path)?;
        let key = load_key(&config.tls.key_path)?;
        let server_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
        Ok(Some(TlsAcceptor::from(Arc::new(server_config))))
    } else {
        Ok(None)
    }
}

/// Loads TLS certificates from a PEM file.
fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>> {
    let cert_file = File::open(path)
        .map_err(|e| anyhow!("Failed to open certificate file '{}': {}", path, e))?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs = rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(anyhow!("No certificates found in '{}'", path));
    }
    Ok(certs)
}

/// Loads a private key from a PEM file.
fn load_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>> {
    let key_file = File::open(path)
        .map_err(|e| anyhow!("Failed to open private key file '{}': {}", path, e))?;
    let mut key_reader = BufReader::new(key_file);
    rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| anyhow!("No private key found in key file '{}'", path))
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Hub endpoint '{}', max {} clients, {} queued frames per client.",
        config.hub_path, config.max_clients, config.outbound_queue_capacity
    );
    if config.reject_anonymous {
        info!("Handshakes without a username will be refused.");
    } else {
        info!("Anonymous connections are accepted; they can send but never receive private messages.");
    }
}
