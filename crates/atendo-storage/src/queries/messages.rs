// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message queries: thread listing and transcription state transitions.

use atendo_core::{AtendoError, TranscriptionStatus};
use rusqlite::params;

use crate::database::Database;
use crate::models::Message;

const MESSAGE_COLUMNS: &str = "id, conversation_id, direction, content, media_url, \
     media_mimetype, audio_transcription, transcription_status, created_at";

fn message_from_row(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        direction: row.get(2)?,
        content: row.get(3)?,
        media_url: row.get(4)?,
        media_mimetype: row.get(5)?,
        audio_transcription: row.get(6)?,
        transcription_status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Insert a new message.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), AtendoError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, direction, content, media_url,
                 media_mimetype, audio_transcription, transcription_status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.direction,
                    msg.content,
                    msg.media_url,
                    msg.media_mimetype,
                    msg.audio_transcription,
                    msg.transcription_status,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a message by ID.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, AtendoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], message_from_row);
            match result {
                Ok(msg) => Ok(Some(msg)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a conversation's messages in chronological order.
pub async fn list_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, AtendoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], message_from_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claim a message for transcription.
///
/// Test-and-set: flips `transcription_status` from NULL to `processing` in a
/// single conditional UPDATE, closing the race between two concurrent
/// transcription requests. Returns `true` when this caller won the claim.
pub async fn begin_transcription(db: &Database, id: &str) -> Result<bool, AtendoError> {
    let id = id.to_string();
    let status = TranscriptionStatus::Processing.to_string();
    db.connection()
        .call(move |conn| {
            let rows = conn.execute(
                "UPDATE messages SET transcription_status = ?1
                 WHERE id = ?2 AND transcription_status IS NULL",
                params![status, id],
            )?;
            Ok(rows == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a successful transcription result.
pub async fn complete_transcription(
    db: &Database,
    id: &str,
    transcription: &str,
) -> Result<(), AtendoError> {
    let id = id.to_string();
    let transcription = transcription.to_string();
    let status = TranscriptionStatus::Completed.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET audio_transcription = ?1, transcription_status = ?2
                 WHERE id = ?3",
                params![transcription, status, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a terminal transcription failure.
pub async fn fail_transcription(db: &Database, id: &str) -> Result<(), AtendoError> {
    let id = id.to_string();
    let status = TranscriptionStatus::Failed.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET transcription_status = ?1 WHERE id = ?2",
                params![status, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
