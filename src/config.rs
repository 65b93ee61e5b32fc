// src/config.rs

//! Manages hub configuration: loading, defaults, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

/// The path reserved for the health endpoint; the hub cannot be mounted there.
pub const HEALTH_PATH: &str = "/health";

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_port() -> u16 {
    8878
}

/// Configuration for TLS encryption of the hub listener.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cert_path")]
    pub cert_path: String,
    #[serde(default = "default_key_path")]
    pub key_path: String,
    /// A peer that has not completed the TLS handshake within this many seconds is dropped.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_path: default_cert_path(),
            key_path: default_key_path(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}

fn default_cert_path() -> String {
    "chathub.crt".to_string()
}
fn default_key_path() -> String {
    "chathub.key".to_string()
}
fn default_handshake_timeout_secs() -> u64 {
    10
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_hub_path")]
    hub_path: String,
    #[serde(default = "default_max_clients")]
    max_clients: usize,
    #[serde(default = "default_outbound_queue_capacity")]
    outbound_queue_capacity: usize,
    #[serde(default = "default_max_frame_bytes")]
    max_frame_bytes: usize,
    #[serde(default)]
    reject_anonymous: bool,
    #[serde(default)]
    tls: TlsConfig,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_hub_path() -> String {
    "/chatHub".to_string()
}
fn default_max_clients() -> usize {
    10000
}
fn default_outbound_queue_capacity() -> usize {
    256
}
fn default_max_frame_bytes() -> usize {
    64 * 1024 // 64 KiB
}

/// Represents the final, validated hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// The path of the WebSocket endpoint, e.g. `/chatHub`.
    pub hub_path: String,
    pub max_clients: usize,
    /// Frames queued per connection before further pushes to it are dropped.
    pub outbound_queue_capacity: usize,
    pub max_frame_bytes: usize,
    /// Refuse handshakes that carry no `username` query parameter.
    pub reject_anonymous: bool,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            hub_path: default_hub_path(),
            max_clients: default_max_clients(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            max_frame_bytes: default_max_frame_bytes(),
            reject_anonymous: false,
            tls: TlsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Config {
            host: raw.host,
            port: raw.port,
            log_level: raw.log_level,
            hub_path: raw.hub_path,
            max_clients: raw.max_clients,
            outbound_queue_capacity: raw.outbound_queue_capacity,
            max_frame_bytes: raw.max_frame_bytes,
            reject_anonymous: raw.reject_anonymous,
            tls: raw.tls,
            metrics: raw.metrics,
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid configuration in '{path}'"))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse configuration TOML")?;
        let config = Config::from(raw_config);
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if !self.hub_path.starts_with('/') || self.hub_path.len() < 2 {
            return Err(anyhow!(
                "hub_path must start with '/' and name an endpoint, got '{}'",
                self.hub_path
            ));
        }
        if self.hub_path == HEALTH_PATH {
            return Err(anyhow!("hub_path cannot be '{HEALTH_PATH}'"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(anyhow!("outbound_queue_capacity cannot be 0"));
        }
        if self.max_frame_bytes == 0 {
            return Err(anyhow!("max_frame_bytes cannot be 0"));
        }
        if self.outbound_queue_capacity < 8 {
            warn!(
                "low outbound_queue_capacity: {}. Bursts to slow clients will be dropped.",
                self.outbound_queue_capacity
            );
        }

        if self.tls.enabled {
            if self.tls.cert_path.trim().is_empty() {
                return Err(anyhow!("tls.cert_path cannot be empty when TLS is enabled"));
            }
            if self.tls.key_path.trim().is_empty() {
                return Err(anyhow!("tls.key_path cannot be empty when TLS is enabled"));
            }
            if self.tls.handshake_timeout_secs == 0 {
                return Err(anyhow!("tls.handshake_timeout_secs cannot be 0"));
            }
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }
        Ok(())
    }
}
