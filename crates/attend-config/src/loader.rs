// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with Figment.
//!
//! Supports XDG hierarchy: `./attend.toml` > `~/.config/attend/attend.toml` > `/etc/attend/attend.toml`
//! with environment variable overrides via the `ATTEND_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AttendConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/attend/attend.toml`
/// 3. `~/.config/attend/attend.toml`
/// 4. `./attend.toml`
/// 5. `ATTEND_*` environment variables
pub fn load_config() -> Result<AttendConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<AttendConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AttendConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AttendConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AttendConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AttendConfig::default()))
        .merge(Toml::file("/etc/attend/attend.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("attend/attend.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("attend.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `ATTEND_GATEWAY_BEARER_TOKEN`
/// must become `gateway.bearer_token`, not `gateway.bearer.token`.
fn env_provider() -> Env {
    Env::prefixed("ATTEND_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("dispatch_", "dispatch.", 1)
            .replacen("metrics_", "metrics.", 1);
        mapped.into()
    })
}
