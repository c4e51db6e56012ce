// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Atendo support console.
//!
//! Atendo is the server side of a WhatsApp customer-support console: agents
//! and admins view conversations, assign them to each other, and watch live
//! activity. This crate holds the error type and the domain types shared
//! between the storage, sync, and gateway crates.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::AtendoError;
pub use types::{
    AgentFilter, AgentSummary, AssignmentEvent, ContactSummary, Conversation,
    ConversationFilter, ConversationStatus, InstanceSummary, Message, TranscriptionStatus,
};
