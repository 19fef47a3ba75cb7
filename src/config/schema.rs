//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the socket
//! layer. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the socket layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SocketLayerConfig {
    /// Listener configuration (bind address, implementation variant).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Which implementation variant the listener hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImplKind {
    /// Platform-native implementation backed directly by the descriptor.
    #[default]
    Platform,
    /// Substitute implementation with tracing and metrics layered on top.
    Instrumented,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,

    /// Implementation variant handed to the application.
    pub implementation: ImplKind,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
            implementation: ImplKind::Platform,
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration for connection establishment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds. Zero disables the
    /// bound.
    pub connect_secs: u64,
}

impl TimeoutConfig {
    /// Connect timeout as a `Duration`; `None` when disabled.
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_secs > 0).then(|| Duration::from_secs(self.connect_secs))
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 5 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
