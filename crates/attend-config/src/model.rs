// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level attend configuration.
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttendConfig {
    /// Process-level settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings (device transport and operator API).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Command queue and delivery settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds to wait for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("attend").join("attend.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("attend.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
///
/// Terminals are usually configured with a fixed server address and port, so
/// the default binds every interface on the conventional push port.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for the operator API. `None` rejects every operator
    /// request; device endpoints are never authenticated.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Command queue and delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Enqueue enrollment commands for every known user when a device checks
    /// in for the first time.
    #[serde(default = "default_seed_new_devices")]
    pub seed_new_devices: bool,

    /// `Return=` value a device reports on success.
    #[serde(default = "default_success_code")]
    pub success_code: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            seed_new_devices: default_seed_new_devices(),
            success_code: default_success_code(),
        }
    }
}

fn default_seed_new_devices() -> bool {
    true
}

fn default_success_code() -> String {
    "0".to_string()
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AttendConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.gateway.port, 8081);
        assert!(config.gateway.bearer_token.is_none());
        assert!(config.dispatch.seed_new_devices);
        assert_eq!(config.dispatch.success_code, "0");
        assert!(config.storage.database_path.ends_with("attend.db"));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: AttendConfig = toml::from_str("[gateway]\nport = 4370\n").unwrap();
        assert_eq!(config.gateway.port, 4370);
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert!(config.metrics.enabled);
    }
}
