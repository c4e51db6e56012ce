// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::AtendoConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AtendoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate gateway host is not empty and is a plausible IP or hostname.
    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.gateway.port == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.port must not be 0".to_string(),
        });
    }

    // Validate database_path is not empty.
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Validate transcription endpoint settings.
    let api_url = config.transcription.api_url.trim();
    if api_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "transcription.api_url must not be empty".to_string(),
        });
    } else if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("transcription.api_url `{api_url}` must be an http(s) URL"),
        });
    }

    if config.transcription.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "transcription.max_tokens must be positive".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
