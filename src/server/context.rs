// src/server/context.rs

use super::listener::HubListener;
use crate::core::state::ServerState;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub state: Arc<ServerState>,
    pub listener: HubListener,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
}
