// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write operations for the directory tables (contacts, instances, agents).
//!
//! These tables are normally populated by the messaging ingestion pipeline;
//! the operations here exist for embedding applications and test fixtures.

use atendo_core::AtendoError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{AgentSummary, ContactSummary, InstanceSummary};

/// Insert a contact.
pub async fn insert_contact(db: &Database, contact: &ContactSummary) -> Result<(), AtendoError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, name, phone_number, avatar_url)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    contact.id,
                    contact.name,
                    contact.phone_number,
                    contact.avatar_url,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a messaging instance.
pub async fn insert_instance(db: &Database, instance: &InstanceSummary) -> Result<(), AtendoError> {
    let instance = instance.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO instances (id, name, status) VALUES (?1, ?2, ?3)",
                params![instance.id, instance.name, instance.status],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert an agent profile.
pub async fn insert_agent(db: &Database, agent: &AgentSummary) -> Result<(), AtendoError> {
    let agent = agent.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agents (id, full_name, avatar_url, presence)
                 VALUES (?1, ?2, ?3, ?4)",
                params![agent.id, agent.full_name, agent.avatar_url, agent.presence],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
