// src/server/connection_loop.rs

//! Contains the main server loop and graceful shutdown.

use super::context::ServerContext;
use super::listener::PeerAddr;
use super::routes;
use anyhow::anyhow;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, error, info, warn};

/// How long open sessions get to close after the shutdown signal.
const CLIENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves the hub until SIGINT/SIGTERM or a background task failure, then
/// shuts down gracefully.
pub async fn run(mut ctx: ServerContext) {
    let state = ctx.state.clone();

    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))
        .expect("Failed to create SIGINT stream");
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))
        .expect("Failed to create SIGTERM stream");

    let app = routes::router(state.clone());
    let mut http_shutdown_rx = state.shutdown_tx.subscribe();
    let serve = axum::serve(
        ctx.listener,
        app.into_make_service_with_connect_info::<PeerAddr>(),
    )
    .with_graceful_shutdown(async move {
        http_shutdown_rx.recv().await.ok();
    });
    let mut http_task = tokio::spawn(async move { serve.await });
    let mut http_finished = false;

    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown.");
                break;
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = &mut http_task => {
                http_finished = true;
                match res {
                    Ok(Ok(())) => warn!("HTTP server stopped unexpectedly."),
                    Ok(Err(e)) => error!("CRITICAL: HTTP server failed: {}. Shutting down.", e),
                    Err(e) => error!("CRITICAL: HTTP server task panicked: {e:?}. Shutting down."),
                }
                break;
            }
        }
    }

    info!("Shutting down. Sending signal to all tasks.");
    if state.shutdown_tx.send(()).is_err() {
        debug!("No task was listening for the shutdown signal.");
    }

    if !http_finished
        && tokio::time::timeout(Duration::from_secs(10), &mut http_task)
            .await
            .is_err()
    {
        warn!("Timed out waiting for the HTTP server to stop accepting.");
        http_task.abort();
    }

    // Every handler unregisters itself on exit; wait for the table to empty.
    let drained = tokio::time::timeout(CLIENT_DRAIN_TIMEOUT, async {
        while !state.clients.is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        let killed = state.clients.kill_all();
        warn!(
            "{} client connection(s) did not close in time and were killed.",
            killed
        );
    } else {
        info!("All client connections closed.");
    }

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!(
        "Server shutdown complete ({} connections served, {} private messages routed, peak {} concurrent).",
        state.stats.get_total_connections(),
        state.stats.get_total_messages(),
        state.stats.get_peak_connections()
    );
}
