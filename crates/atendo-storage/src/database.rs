// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Query modules accept `&Database` and call through
//! `db.connection().call()`.

use std::path::Path;
use std::time::Duration;

use atendo_core::AtendoError;
use tracing::debug;

/// Handle to the SQLite database.
///
/// Wraps a single `tokio_rusqlite::Connection`; all closure calls are
/// serialized on one background thread, which eliminates SQLITE_BUSY errors
/// under concurrent access.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, AtendoError> {
        Self::open_with(path, true).await
    }

    /// Open (or create) the database at `path`, optionally without WAL mode,
    /// and run all pending migrations.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, AtendoError> {
        if path != ":memory:"
            && let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| AtendoError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_sql_err)?;

        conn.call(move |conn| {
            if wal_mode {
                // journal_mode returns a row; query_row instead of execute.
                conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
                    .map_err(map_sql_err)?;
            }
            conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")
                .map_err(map_sql_err)?;
            conn.busy_timeout(Duration::from_secs(5)).map_err(map_sql_err)?;

            crate::migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(e) => e,
            e => AtendoError::Storage {
                source: Box::new(e),
            },
        })?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), AtendoError> {
        self.conn
            .call(|conn| {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> AtendoError {
    AtendoError::Storage {
        source: Box::new(e),
    }
}

/// Map a raw rusqlite error into the workspace error type.
pub(crate) fn map_sql_err(e: rusqlite::Error) -> AtendoError {
    AtendoError::Storage {
        source: Box::new(e),
    }
}
