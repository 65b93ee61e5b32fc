// src/core/state/stats.rs

//! Contains state definitions and logic for hub statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Holds all state and logic related to hub-wide statistics and monitoring.
#[derive(Debug)]
pub struct StatsState {
    /// The total number of connections accepted by the hub since startup.
    total_connections: AtomicU64,
    /// The total number of private messages routed since startup.
    total_messages: AtomicU64,
    /// The highest number of simultaneously connected clients observed.
    peak_connections: AtomicU64,
}

impl Default for StatsState {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsState {
    /// Creates a new `StatsState` with initialized counters.
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            total_messages: AtomicU64::new(0),
            peak_connections: AtomicU64::new(0),
        }
    }

    /// Records an accepted connection, given the number of clients now connected.
    pub fn record_connection(&self, connected_now: usize) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.peak_connections
            .fetch_max(connected_now as u64, Ordering::Relaxed);
    }

    /// Gets the total number of connections received.
    pub fn get_total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    /// Atomically increments the total number of private messages routed.
    pub fn increment_total_messages(&self) {
        self.total_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the total number of private messages routed.
    pub fn get_total_messages(&self) -> u64 {
        self.total_messages.load(Ordering::Relaxed)
    }

    /// Gets the highest number of simultaneously connected clients.
    pub fn get_peak_connections(&self) -> u64 {
        self.peak_connections.load(Ordering::Relaxed)
    }
}
