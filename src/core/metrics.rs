// src/core/metrics.rs

//! Defines and registers Prometheus metrics for hub monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, TextEncoder, register_counter, register_gauge, register_histogram,
};

lazy_static! {
    // --- Connection Gauges ---
    /// The number of WebSocket clients currently connected to the hub.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("chathub_connected_clients", "Number of currently connected clients.").unwrap();
    /// The number of entries in the connection registry.
    pub static ref REGISTERED_CONNECTIONS: Gauge =
        register_gauge!("chathub_registered_connections", "Number of connections in the registry.").unwrap();

    // --- Counters ---
    /// The total number of connections accepted since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("chathub_connections_received_total", "Total number of connections received.").unwrap();
    /// The total number of handshakes refused (capacity or anonymous policy).
    pub static ref CONNECTIONS_REJECTED_TOTAL: Counter =
        register_counter!("chathub_connections_rejected_total", "Total number of refused handshakes.").unwrap();
    /// The total number of private messages routed, including those with no live receiver.
    pub static ref PRIVATE_MESSAGES_ROUTED_TOTAL: Counter =
        register_counter!("chathub_private_messages_routed_total", "Total number of private messages routed.").unwrap();
    /// The total number of per-connection pushes that were enqueued.
    pub static ref DELIVERIES_TOTAL: Counter =
        register_counter!("chathub_deliveries_total", "Total number of frames enqueued to receivers.").unwrap();
    /// The total number of per-connection pushes that failed.
    pub static ref DELIVERY_FAILURES_TOTAL: Counter =
        register_counter!("chathub_delivery_failures_total", "Total number of frames that could not be enqueued.").unwrap();

    // --- Histograms ---
    /// A histogram of routing latencies (lookup plus fan-out).
    pub static ref ROUTE_LATENCY_SECONDS: Histogram =
        register_histogram!("chathub_route_latency_seconds", "Latency of private message routing in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
