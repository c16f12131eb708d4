// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Points ledger persisted to the `points_transactions` table.
//!
//! Awards carry a reference id (e.g. `BOOKING-<id>`) and are recorded at most
//! once per reference. Deductions are plain debit rows. The balance is the
//! signed sum of all rows for a user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use innkeep_core::{AdapterType, HealthStatus, InnkeepError, LoyaltyLedger, PluginAdapter};
use innkeep_storage::{Database, format_timestamp, map_tr_err};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info};

/// Direction of a points movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Award,
    Deduct,
}

/// One row of a user's points history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsTransaction {
    /// UUID v4.
    pub id: String,
    pub user_id: String,
    /// Always positive; `kind` gives the sign.
    pub points: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persistent points ledger backed by SQLite.
#[derive(Clone)]
pub struct PointsLedger {
    db: Database,
}

impl PointsLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert one movement. Returns false if an award with the same
    /// reference id already exists.
    async fn record(
        &self,
        user_id: &str,
        points: i64,
        kind: TransactionKind,
        description: &str,
        reference_id: Option<&str>,
    ) -> Result<bool, InnkeepError> {
        if points < 0 {
            return Err(InnkeepError::Internal(format!(
                "points must be non-negative, got {points}"
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let user_id = user_id.to_string();
        let description = description.to_string();
        let reference_id = reference_id.map(str::to_string);
        let created_at = format_timestamp(Utc::now());

        self.db
            .connection()
            .call(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO points_transactions
                        (id, user_id, points, kind, description, reference_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(reference_id) DO NOTHING",
                    params![
                        id,
                        user_id,
                        points,
                        kind.to_string(),
                        description,
                        reference_id,
                        created_at
                    ],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Current points balance of `user_id`. May be negative if deductions
    /// outran awards.
    pub async fn balance(&self, user_id: &str) -> Result<i64, InnkeepError> {
        let user_id = user_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT COALESCE(SUM(CASE kind WHEN 'award' THEN points ELSE -points END), 0)
                     FROM points_transactions WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// All movements for `user_id`, newest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<PointsTransaction>, InnkeepError> {
        let user_id = user_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, points, kind, description, reference_id, created_at
                     FROM points_transactions
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC",
                )?;
                let rows = stmt.query_map(params![user_id], |row| {
                    let kind: String = row.get(3)?;
                    let created_at: String = row.get(6)?;
                    Ok(PointsTransaction {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        points: row.get(2)?,
                        kind: kind.parse().map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                3,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                        description: row.get(4)?,
                        reference_id: row.get(5)?,
                        created_at: DateTime::parse_from_rfc3339(&created_at)
                            .map(|dt| dt.with_timezone(&Utc))
                            .map_err(|e| {
                                rusqlite::Error::FromSqlConversionFailure(
                                    6,
                                    rusqlite::types::Type::Text,
                                    Box::new(e),
                                )
                            })?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for PointsLedger {
    fn name(&self) -> &str {
        "sqlite-points"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LoyaltyLedger
    }

    async fn health_check(&self) -> Result<HealthStatus, InnkeepError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1 FROM points_transactions LIMIT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl LoyaltyLedger for PointsLedger {
    async fn award(
        &self,
        user_id: &str,
        points: i64,
        description: &str,
        reference_id: &str,
    ) -> Result<(), InnkeepError> {
        let inserted = self
            .record(user_id, points, TransactionKind::Award, description, Some(reference_id))
            .await?;
        if inserted {
            info!(user_id, points, reference_id, "points awarded");
        } else {
            debug!(user_id, reference_id, "award already recorded, skipping");
        }
        Ok(())
    }

    async fn deduct(
        &self,
        user_id: &str,
        points: i64,
        description: &str,
    ) -> Result<(), InnkeepError> {
        self.record(user_id, points, TransactionKind::Deduct, description, None)
            .await?;
        info!(user_id, points, "points deducted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn ledger() -> (PointsLedger, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("points.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (PointsLedger::new(db), dir)
    }

    #[tokio::test]
    async fn award_and_deduct_update_balance() {
        let (ledger, _dir) = ledger().await;
        ledger.award("u1", 20000, "Booking 101", "BOOKING-b1").await.unwrap();
        ledger.award("u2", 500, "Booking 102", "BOOKING-b2").await.unwrap();
        ledger.deduct("u1", 5000, "Cancelled booking").await.unwrap();

        assert_eq!(ledger.balance("u1").await.unwrap(), 15000);
        assert_eq!(ledger.balance("u2").await.unwrap(), 500);
        assert_eq!(ledger.balance("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn award_is_idempotent_per_reference() {
        let (ledger, _dir) = ledger().await;
        ledger.award("u1", 20000, "Booking 101", "BOOKING-b1").await.unwrap();
        ledger.award("u1", 20000, "Booking 101", "BOOKING-b1").await.unwrap();

        assert_eq!(ledger.balance("u1").await.unwrap(), 20000);
        assert_eq!(ledger.history("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_deductions_are_all_recorded() {
        let (ledger, _dir) = ledger().await;
        ledger.deduct("u1", 10, "first").await.unwrap();
        ledger.deduct("u1", 10, "second").await.unwrap();

        let history = ledger.history("u1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|t| t.kind == TransactionKind::Deduct));
        assert!(history.iter().all(|t| t.reference_id.is_none()));
        assert_eq!(ledger.balance("u1").await.unwrap(), -20);
    }

    #[tokio::test]
    async fn negative_points_are_rejected() {
        let (ledger, _dir) = ledger().await;
        assert!(ledger.award("u1", -1, "bad", "REF").await.is_err());
        assert_eq!(ledger.history("u1").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn health_check_reports_healthy() {
        let (ledger, _dir) = ledger().await;
        assert_eq!(ledger.health_check().await.unwrap(), HealthStatus::Healthy);
        assert_eq!(ledger.adapter_type(), AdapterType::LoyaltyLedger);
    }
}
