// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! `Database` wraps that one connection; query modules take `&Database` and run
//! their SQL inside `connection().call(..)`. Multi-statement mutations open a
//! rusqlite transaction inside a single call so they commit or roll back as a unit.

use innkeep_core::InnkeepError;
use tracing::{debug, info};

use crate::migrations;

/// Handle to the engine's SQLite database.
///
/// Cloning is cheap and shares the same background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode, then run migrations.
    pub async fn open(path: &str) -> Result<Self, InnkeepError> {
        Self::open_with(path, true).await
    }

    /// Open with explicit WAL setting.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, InnkeepError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(InnkeepError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(InnkeepError::storage)?;
        let db = Self { conn };
        db.initialize(wal_mode).await?;
        info!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// In-memory database, migrated. Each call yields an independent database.
    pub async fn open_in_memory() -> Result<Self, InnkeepError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(InnkeepError::storage)?;
        let db = Self { conn };
        db.initialize(false).await?;
        Ok(db)
    }

    async fn initialize(&self, wal_mode: bool) -> Result<(), InnkeepError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                }
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.pragma_update(None, "busy_timeout", 5000)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        self.conn
            .call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(flatten_call_err)?;
        debug!("migrations applied");
        Ok(())
    }

    /// The single writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the background connection, flushing WAL state.
    pub async fn close(self) -> Result<(), InnkeepError> {
        self.conn.close().await.map_err(InnkeepError::storage)
    }
}

/// Convert a tokio-rusqlite error into `InnkeepError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> InnkeepError {
    InnkeepError::Storage {
        source: Box::new(e),
    }
}

/// Unwrap the closure's own error from a `call` failure; connection-level
/// failures become `InnkeepError::Storage`.
pub fn flatten_call_err<E>(e: tokio_rusqlite::Error<E>) -> E
where
    E: From<InnkeepError> + std::fmt::Display,
{
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => E::from(InnkeepError::Storage {
            source: other.to_string().into(),
        }),
    }
}

/// Convert a plain rusqlite error into `InnkeepError::Storage`.
pub fn sql_err(e: rusqlite::Error) -> InnkeepError {
    InnkeepError::storage(e)
}

/// True if `err` was raised by the booking overlap trigger.
pub fn is_overlap_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("booking_overlap")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_and_enables_foreign_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("innkeep.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let (tables, fk): (i64, i64) = db
            .connection()
            .call(|conn| -> Result<(i64, i64), rusqlite::Error> {
                let tables = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('bookings', 'booking_audit_log', 'queue', 'points_transactions')",
                    [],
                    |row| row.get(0),
                )?;
                let fk = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
                Ok((tables, fk))
            })
            .await
            .unwrap();

        assert_eq!(tables, 4);
        assert_eq!(fk, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_does_not_rerun_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("innkeep.db");
        let path = path.to_str().unwrap();

        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        let journal: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(journal.to_lowercase(), "wal");
    }
}
