// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use atendo_core::{AgentFilter, AssignmentEvent, AtendoError, ConversationFilter, Message};
use atendo_storage::queries;

use crate::server::GatewayState;
use crate::transcribe::TranscribeOutcome;

/// Query parameters for GET /v1/conversations.
#[derive(Debug, Default, Deserialize)]
pub struct ConversationListParams {
    /// Status filter; absent or `all` means no filter.
    #[serde(default)]
    pub status: Option<String>,
    /// Restrict to one messaging instance.
    #[serde(default)]
    pub instance_id: Option<String>,
    /// Agent filter; the sentinel `unassigned` selects unassigned rows.
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Free-text search over contact name, phone, and preview.
    #[serde(default)]
    pub search: Option<String>,
}

impl ConversationListParams {
    fn into_filter(self) -> ConversationFilter {
        ConversationFilter {
            status: self.status,
            instance_id: self.instance_id,
            agent: match self.agent_id.as_deref() {
                None => AgentFilter::Any,
                Some("unassigned") => AgentFilter::Unassigned,
                Some(id) => AgentFilter::Agent(id.to_string()),
            },
            search: self.search,
        }
    }
}

/// Request body for POST /v1/conversations/{id}/assign.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// New assignee; `null` or absent unassigns.
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Audit reason, defaulting to a manual action.
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_reason() -> String {
    "manual".to_string()
}

/// Response body for POST /v1/conversations/{id}/assign.
#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub conversation_id: String,
    pub assigned_to: Option<String>,
}

/// Response body for GET /v1/conversations/{id}/messages.
#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
}

/// Response body for GET /v1/conversations/{id}/assignments.
#[derive(Debug, Serialize)]
pub struct AssignmentListResponse {
    pub events: Vec<AssignmentEvent>,
}

/// Response body for POST /v1/messages/{id}/transcribe.
#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: AtendoError) -> Response {
    let status = match &err {
        AtendoError::NotFound { .. } => StatusCode::NOT_FOUND,
        AtendoError::Transcription { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// GET /v1/conversations
pub async fn get_conversations(
    State(state): State<GatewayState>,
    Query(params): Query<ConversationListParams>,
) -> Response {
    match state.query.list(&params.into_filter()).await {
        Ok(page) => (StatusCode::OK, Json(page.as_ref().clone())).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/conversations/refresh
///
/// Drops all cached pages; the next list hits storage.
pub async fn post_refresh(State(state): State<GatewayState>) -> StatusCode {
    state.query.refresh();
    StatusCode::NO_CONTENT
}

/// GET /v1/conversations/{id}/messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match queries::messages::list_messages(&state.db, &id).await {
        Ok(messages) => (StatusCode::OK, Json(MessageListResponse { messages })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /v1/conversations/{id}/assignments
pub async fn get_assignments(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match queries::conversations::list_assignment_events(&state.db, &id).await {
        Ok(events) => (StatusCode::OK, Json(AssignmentListResponse { events })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/conversations/{id}/assign
pub async fn post_assign(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Response {
    match state
        .assignment
        .assign(&id, body.assigned_to.as_deref(), &body.reason)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(AssignResponse {
                conversation_id: id,
                assigned_to: body.assigned_to,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/messages/{id}/transcribe
pub async fn post_transcribe(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.transcriber.transcribe(&id).await {
        Ok(TranscribeOutcome::Completed { transcription }) => (
            StatusCode::OK,
            Json(TranscriptionResponse {
                status: "completed".to_string(),
                transcription: Some(transcription),
            }),
        )
            .into_response(),
        Ok(TranscribeOutcome::Processing) => (
            StatusCode::OK,
            Json(TranscriptionResponse {
                status: "processing".to_string(),
                transcription: None,
            }),
        )
            .into_response(),
        Ok(TranscribeOutcome::Failed) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "transcription previously failed and will not be retried".to_string(),
            }),
        )
            .into_response(),
        Ok(TranscribeOutcome::NoAudio) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "message has no audio attachment".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health (unauthenticated, for probes)
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
