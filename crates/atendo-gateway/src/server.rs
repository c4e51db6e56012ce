// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use atendo_core::AtendoError;
use atendo_storage::Database;
use atendo_sync::{AssignmentService, ConversationQueryService};
use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::transcribe::Transcriber;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Cache-backed conversation listing.
    pub query: Arc<ConversationQueryService>,
    /// Assignment writes with audit trail.
    pub assignment: Arc<AssignmentService>,
    /// Direct storage handle for message and audit reads.
    pub db: Arc<Database>,
    /// Voice message transcription driver.
    pub transcriber: Arc<Transcriber>,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors GatewayConfig from atendo-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Bearer token for auth (None = all authed routes reject).
    pub bearer_token: Option<String>,
}

/// Build the gateway router.
///
/// `/health` is public; everything under `/v1` requires bearer auth.
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/conversations", get(handlers::get_conversations))
        .route("/v1/conversations/refresh", post(handlers::post_refresh))
        .route(
            "/v1/conversations/{id}/messages",
            get(handlers::get_messages),
        )
        .route(
            "/v1/conversations/{id}/assignments",
            get(handlers::get_assignments),
        )
        .route("/v1/conversations/{id}/assign", post(handlers::post_assign))
        .route(
            "/v1/messages/{id}/transcribe",
            post(handlers::post_transcribe),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), AtendoError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AtendoError::Gateway {
                message: format!("failed to bind gateway to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| AtendoError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
