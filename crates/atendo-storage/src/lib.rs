// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Atendo support console.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query operations for
//! conversations, messages, and the assignment audit trail.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread; the `Database` struct IS the single writer. Do NOT create
//! additional Connection instances for writes.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
