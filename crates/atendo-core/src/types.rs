// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Atendo workspace.
//!
//! The canonical entity records live here for use across crate boundaries;
//! `atendo-storage` re-exports them for convenience.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Recognized conversation statuses.
///
/// Status is stored as an opaque string and no transition rules are enforced
/// in this layer. Anything other than the three recognized values, including
/// NULL, classifies as `Unknown`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Waiting,
    Closed,
    Unknown,
}

impl ConversationStatus {
    /// Classify a raw status column value.
    pub fn classify(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok())
            .unwrap_or(ConversationStatus::Unknown)
    }
}

/// Audio transcription lifecycle states.
///
/// Terminal machine: idle (NULL) -> processing -> completed | failed.
/// There is no transition back to idle and `failed` is never retried
/// automatically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionStatus {
    Processing,
    Completed,
    Failed,
}

/// Contact summary joined onto a conversation (read-only from this layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub avatar_url: Option<String>,
}

/// Messaging instance summary joined onto a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
}

/// Assigned-agent summary joined onto a conversation (read-only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub presence: Option<String>,
}

/// A conversation record with its joined summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub contact_id: String,
    pub instance_id: String,
    pub assigned_to: Option<String>,
    pub status: Option<String>,
    pub last_message_at: Option<String>,
    pub last_message_preview: Option<String>,
    pub unread_count: i64,
    pub created_at: String,
    pub contact: Option<ContactSummary>,
    pub instance: Option<InstanceSummary>,
    pub assigned_agent: Option<AgentSummary>,
}

impl Conversation {
    /// Classified status, with unrecognized or NULL values as `Unknown`.
    pub fn status(&self) -> ConversationStatus {
        ConversationStatus::classify(self.status.as_deref())
    }
}

/// A message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// "inbound" (from the contact) or "outbound" (from an agent).
    pub direction: String,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub media_mimetype: Option<String>,
    pub audio_transcription: Option<String>,
    pub transcription_status: Option<String>,
    pub created_at: String,
}

/// Audit record for an assignment or transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub id: i64,
    pub conversation_id: String,
    pub assigned_to: Option<String>,
    pub reason: String,
    pub created_at: String,
}

/// Assigned-agent filter dimension.
///
/// `Unassigned` is a distinct sentinel (filter for NULL assignment), not the
/// same as `Any`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentFilter {
    #[default]
    Any,
    Unassigned,
    Agent(String),
}

/// Transient filter tuple for conversation-list queries.
///
/// Not persisted; the full tuple (search term included) is the cache key, so
/// a superseded query's result can never overwrite a different filter's
/// entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationFilter {
    /// Exact status match. `None` or the `"all"` sentinel means no filtering.
    pub status: Option<String>,
    /// Exact instance match.
    pub instance_id: Option<String>,
    /// Assigned-agent dimension.
    pub agent: AgentFilter,
    /// Case-insensitive substring search over contact name, phone number,
    /// and last-message preview. Applied locally after the structural query.
    pub search: Option<String>,
}

impl ConversationFilter {
    /// The status value to push down to the store, if any.
    pub fn effective_status(&self) -> Option<&str> {
        match self.status.as_deref() {
            None | Some("all") => None,
            Some(s) => Some(s),
        }
    }
}
