// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./atendo.toml` > `~/.config/atendo/atendo.toml` > `/etc/atendo/atendo.toml`
//! with environment variable overrides via `ATENDO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::AtendoConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/atendo/atendo.toml` (system-wide)
/// 3. `~/.config/atendo/atendo.toml` (user XDG config)
/// 4. `./atendo.toml` (local directory)
/// 5. `ATENDO_*` environment variables
pub fn load_config() -> Result<AtendoConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<AtendoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AtendoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AtendoConfig::default()))
        .merge(Toml::file("/etc/atendo/atendo.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("atendo/atendo.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("atendo.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `ATENDO_GATEWAY_BEARER_TOKEN`
/// must map to `gateway.bearer_token`, not `gateway.bearer.token`.
fn env_provider() -> Env {
    Env::prefixed("ATENDO_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: ATENDO_GATEWAY_BEARER_TOKEN -> "gateway_bearer_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("transcription_", "transcription.", 1);
        mapped.into()
    })
}
