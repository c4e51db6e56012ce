// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation queries: filtered listing with joins, assignment writes,
//! and the assignment audit trail.

use atendo_core::AtendoError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{
    AgentFilter, AgentSummary, AssignmentEvent, ContactSummary, Conversation,
    ConversationFilter, InstanceSummary,
};

/// Insert a conversation row. Joined summaries on the record are ignored.
pub async fn insert_conversation(db: &Database, conv: &Conversation) -> Result<(), AtendoError> {
    let conv = conv.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations
                 (id, contact_id, instance_id, assigned_to, status,
                  last_message_at, last_message_preview, unread_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    conv.id,
                    conv.contact_id,
                    conv.instance_id,
                    conv.assigned_to,
                    conv.status,
                    conv.last_message_at,
                    conv.last_message_preview,
                    conv.unread_count,
                    conv.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List conversations matching the structural parts of `filter`, joined
/// with contact, instance, and assigned-agent summaries.
///
/// Ordered by last-message timestamp descending with NULLs last. The
/// free-text `search` field is NOT applied here; it is a local filter on
/// the result set (see the conversation query service).
pub async fn list_conversations(
    db: &Database,
    filter: &ConversationFilter,
) -> Result<Vec<Conversation>, AtendoError> {
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from(
                "SELECT c.id, c.contact_id, c.instance_id, c.assigned_to, c.status,
                        c.last_message_at, c.last_message_preview, c.unread_count, c.created_at,
                        ct.id, ct.name, ct.phone_number, ct.avatar_url,
                        i.id, i.name, i.status,
                        a.id, a.full_name, a.avatar_url, a.presence
                 FROM conversations c
                 LEFT JOIN contacts ct ON ct.id = c.contact_id
                 LEFT JOIN instances i ON i.id = c.instance_id
                 LEFT JOIN agents a ON a.id = c.assigned_to",
            );

            let mut clauses: Vec<&str> = Vec::new();
            let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(status) = filter.effective_status() {
                clauses.push("c.status = ?");
                args.push(Box::new(status.to_string()));
            }
            if let Some(instance_id) = &filter.instance_id {
                clauses.push("c.instance_id = ?");
                args.push(Box::new(instance_id.clone()));
            }
            match &filter.agent {
                AgentFilter::Any => {}
                AgentFilter::Unassigned => clauses.push("c.assigned_to IS NULL"),
                AgentFilter::Agent(id) => {
                    clauses.push("c.assigned_to = ?");
                    args.push(Box::new(id.clone()));
                }
            }

            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY c.last_message_at IS NULL, c.last_message_at DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(args), |row| {
                let contact = match row.get::<_, Option<String>>(9)? {
                    Some(id) => Some(ContactSummary {
                        id,
                        name: row.get(10)?,
                        phone_number: row.get(11)?,
                        avatar_url: row.get(12)?,
                    }),
                    None => None,
                };
                let instance = match row.get::<_, Option<String>>(13)? {
                    Some(id) => Some(InstanceSummary {
                        id,
                        name: row.get(14)?,
                        status: row.get(15)?,
                    }),
                    None => None,
                };
                let assigned_agent = match row.get::<_, Option<String>>(16)? {
                    Some(id) => Some(AgentSummary {
                        id,
                        full_name: row.get(17)?,
                        avatar_url: row.get(18)?,
                        presence: row.get(19)?,
                    }),
                    None => None,
                };
                Ok(Conversation {
                    id: row.get(0)?,
                    contact_id: row.get(1)?,
                    instance_id: row.get(2)?,
                    assigned_to: row.get(3)?,
                    status: row.get(4)?,
                    last_message_at: row.get(5)?,
                    last_message_preview: row.get(6)?,
                    unread_count: row.get(7)?,
                    created_at: row.get(8)?,
                    contact,
                    instance,
                    assigned_agent,
                })
            })?;

            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Assign (or unassign, with `None`) a conversation to an agent, recording
/// the reason in the audit trail.
///
/// Plain last-write-wins UPDATE: concurrent assignments land in arrival
/// order and the final assignee is whichever write lands last. No version
/// check or conflict detection.
pub async fn assign_conversation(
    db: &Database,
    conversation_id: &str,
    assigned_to: Option<&str>,
    reason: &str,
) -> Result<(), AtendoError> {
    let id = conversation_id.to_string();
    let assignee = assigned_to.map(str::to_string);
    let reason = reason.to_string();

    let updated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let rows = tx.execute(
                "UPDATE conversations SET assigned_to = ?1 WHERE id = ?2",
                params![assignee, id],
            )?;
            if rows > 0 {
                tx.execute(
                    "INSERT INTO assignment_events (conversation_id, assigned_to, reason)
                     VALUES (?1, ?2, ?3)",
                    params![id, assignee, reason],
                )?;
            }
            tx.commit()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if updated == 0 {
        return Err(AtendoError::NotFound {
            entity: "conversation",
            id: conversation_id.to_string(),
        });
    }
    Ok(())
}

/// List the assignment audit trail for a conversation, oldest first.
pub async fn list_assignment_events(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<AssignmentEvent>, AtendoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, assigned_to, reason, created_at
                 FROM assignment_events WHERE conversation_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok(AssignmentEvent {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    assigned_to: row.get(2)?,
                    reason: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
