// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API gateway for the Atendo support console.
//!
//! Serves the conversation list, assignment, and transcription endpoints on
//! axum, with bearer-token auth on everything except `/health`.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod transcribe;

pub use auth::AuthConfig;
pub use server::{GatewayState, ServerConfig, build_router, start_server};
pub use transcribe::{TranscribeOutcome, Transcriber, TranscriberConfig};
