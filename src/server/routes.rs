// src/server/routes.rs

//! HTTP routes: the WebSocket hub endpoint and a health probe.

use super::listener::PeerAddr;
use crate::config::HEALTH_PATH;
use crate::connection::ConnectionHandler;
use crate::core::metrics;
use crate::core::state::ServerState;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handshake parameters read from the hub URL's query string.
#[derive(Debug, Deserialize)]
pub struct HubQuery {
    #[serde(default)]
    pub username: Option<String>,
}

/// Builds the hub's HTTP router. Must be served with `ConnectInfo<PeerAddr>`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(&state.config.hub_path, get(hub_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(state)
}

/// Upgrades the request to a WebSocket and attaches it to the hub.
async fn hub_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(PeerAddr(addr)): ConnectInfo<PeerAddr>,
    Query(query): Query<HubQuery>,
    State(state): State<Arc<ServerState>>,
) -> Response {
    // Without a username the session is anonymous and never matches a lookup.
    let username = query.username;
    if state.config.reject_anonymous && username.as_deref().is_none_or(|u| u.trim().is_empty()) {
        debug!("Refusing anonymous handshake from {}.", addr);
        metrics::CONNECTIONS_REJECTED_TOTAL.inc();
        return (
            StatusCode::BAD_REQUEST,
            "the 'username' query parameter is required",
        )
            .into_response();
    }

    let permit = match state.connection_permits.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            warn!(
                "Refusing connection from {}: max number of clients reached.",
                addr
            );
            metrics::CONNECTIONS_REJECTED_TOTAL.inc();
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "max number of clients reached",
            )
                .into_response();
        }
    };

    let max_frame_bytes = state.config.max_frame_bytes;
    ws.max_message_size(max_frame_bytes)
        .on_upgrade(move |socket| async move {
            let handler = ConnectionHandler::connect(socket, addr, state, username, permit);
            let connection_id = handler.connection_id().clone();
            if let Err(e) = handler.run().await {
                warn!(
                    "Connection {} from {} terminated unexpectedly: {}",
                    connection_id, addr, e
                );
            }
        })
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "connections": state.clients.len(),
        "registered": state.registry.len(),
        "total_connections": state.stats.get_total_connections(),
        "total_messages": state.stats.get_total_messages(),
    }))
}
