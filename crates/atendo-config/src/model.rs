// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Atendo support console.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Atendo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AtendoConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Audio transcription settings.
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "atendo".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
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
        .map(|p| p.join("atendo").join("atendo.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("atendo.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for API auth. When `None` the gateway rejects every
    /// authenticated route; only `/health` stays reachable.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8090
}

/// Audio transcription configuration.
///
/// Voice notes are transcribed by a third-party speech-to-text model behind
/// a chat-completions style API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptionConfig {
    /// Chat-completions endpoint URL of the speech-to-text provider.
    #[serde(default = "default_transcription_api_url")]
    pub api_url: String,

    /// API key for the provider. `None` disables the transcription endpoint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier to request.
    #[serde(default = "default_transcription_model")]
    pub model: String,

    /// Instruction prompt sent alongside the audio.
    #[serde(default = "default_transcription_prompt")]
    pub prompt: String,

    /// Maximum tokens to generate per transcription.
    #[serde(default = "default_transcription_max_tokens")]
    pub max_tokens: u32,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_url: default_transcription_api_url(),
            api_key: None,
            model: default_transcription_model(),
            prompt: default_transcription_prompt(),
            max_tokens: default_transcription_max_tokens(),
        }
    }
}

fn default_transcription_api_url() -> String {
    "https://api.lovable.dev/v1/chat/completions".to_string()
}

fn default_transcription_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

fn default_transcription_prompt() -> String {
    "Transcreva este áudio em português. Retorne APENAS o texto transcrito, \
     sem explicações ou formatação adicional. Se não conseguir entender o \
     áudio, responda com \"[Áudio inaudível]\"."
        .to_string()
}

fn default_transcription_max_tokens() -> u32 {
    1000
}
