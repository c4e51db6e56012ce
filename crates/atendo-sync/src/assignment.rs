// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation assignment with audit trail and change notification.

use std::sync::Arc;

use atendo_core::AtendoError;
use atendo_storage::{Database, queries};
use tracing::info;

use crate::feed::{ChangeFeed, Table};

/// Assigns, transfers, and unassigns conversations.
///
/// Writes are last-write-wins: concurrent assignments of the same
/// conversation both succeed and both leave an audit event, with the later
/// write determining the final assignee. Every successful write publishes a
/// conversations change so other viewers refetch.
pub struct AssignmentService {
    db: Arc<Database>,
    feed: ChangeFeed,
}

impl AssignmentService {
    pub fn new(db: Arc<Database>, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    /// Set or clear a conversation's assignee, recording `reason` in the
    /// audit trail. `None` unassigns.
    pub async fn assign(
        &self,
        conversation_id: &str,
        assigned_to: Option<&str>,
        reason: &str,
    ) -> Result<(), AtendoError> {
        queries::conversations::assign_conversation(&self.db, conversation_id, assigned_to, reason)
            .await?;
        info!(conversation_id, assignee = ?assigned_to, reason, "conversation assigned");
        self.feed.publish(Table::Conversations);
        Ok(())
    }
}
