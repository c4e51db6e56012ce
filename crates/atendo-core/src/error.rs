// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Atendo support console.

use thiserror::Error;

/// The primary error type used across all Atendo crates.
#[derive(Debug, Error)]
pub enum AtendoError {
    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Audio transcription errors (download failure, upstream API failure).
    #[error("transcription error: {message}")]
    Transcription {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Gateway errors (bind failure, server error).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AtendoError {
    /// True when the error means "the row you asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, AtendoError::NotFound { .. })
    }
}
