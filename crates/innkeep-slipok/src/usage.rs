// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent counter of provider calls.
//!
//! SlipOK exposes no quota endpoint, so each call that reaches the provider
//! is recorded in `slipok_usage` and the monthly count is derived locally.

use chrono::{DateTime, Utc};
use innkeep_core::{InnkeepError, SlipokStatus};
use innkeep_storage::{Database, format_timestamp, map_tr_err};
use rusqlite::params;

#[derive(Clone)]
pub struct UsageLedger {
    db: Database,
}

impl UsageLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record one provider call with its outcome.
    pub async fn record(&self, outcome: SlipokStatus, at: DateTime<Utc>) -> Result<(), InnkeepError> {
        let outcome = outcome.to_string();
        let created_at = format_timestamp(at);
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO slipok_usage (outcome, created_at) VALUES (?1, ?2)",
                    params![outcome, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Calls recorded in the calendar month (UTC) containing `at`.
    pub async fn monthly_count(&self, at: DateTime<Utc>) -> Result<u64, InnkeepError> {
        let prefix = format!("{}%", at.format("%Y-%m"));
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM slipok_usage WHERE created_at LIKE ?1",
                    params![prefix],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }
}
