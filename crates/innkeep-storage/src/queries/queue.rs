// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable work queue with at-least-once delivery.
//!
//! A dequeued entry is leased, not removed. If the consumer dies before
//! `ack` or `fail`, the lease expires and the entry is delivered again.
//! Finished entries stay in the table until `purge_finished` removes them.

use chrono::{DateTime, Utc};
use innkeep_core::InnkeepError;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_tr_err};
use crate::models::{QueueEntry, format_timestamp};

/// What `fail` did with the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Back to pending for another attempt.
    Retrying { attempts: i32 },
    /// Attempts exhausted; the entry stays in `failed` for inspection.
    Parked { attempts: i32 },
}

/// Enqueue inside a caller-owned transaction.
pub fn enqueue_in(
    conn: &Connection,
    queue_name: &str,
    payload: &str,
    max_attempts: i32,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO queue (queue_name, payload, max_attempts) VALUES (?1, ?2, ?3)",
        params![queue_name, payload, max_attempts],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Enqueue a new item. Returns the queue entry ID.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    max_attempts: i32,
) -> Result<i64, InnkeepError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| enqueue_in(conn, &queue_name, &payload, max_attempts))
        .await
        .map_err(map_tr_err)
}

/// Lease the oldest deliverable entry of `queue_name` for `lease_secs`.
///
/// Deliverable means pending, or processing with an expired lease.
pub async fn dequeue(
    db: &Database,
    queue_name: &str,
    lease_secs: u64,
) -> Result<Option<QueueEntry>, InnkeepError> {
    let queue_name = queue_name.to_string();
    let lease = format!("+{lease_secs} seconds");
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let entry = tx
                .query_row(
                    "SELECT id, queue_name, payload, status, attempts, max_attempts,
                            last_error, created_at, updated_at, locked_until
                     FROM queue
                     WHERE queue_name = ?1
                       AND (status = 'pending'
                            OR (status = 'processing'
                                AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))
                     ORDER BY id ASC
                     LIMIT 1",
                    params![queue_name],
                    |row| {
                        Ok(QueueEntry {
                            id: row.get(0)?,
                            queue_name: row.get(1)?,
                            payload: row.get(2)?,
                            status: row.get(3)?,
                            attempts: row.get(4)?,
                            max_attempts: row.get(5)?,
                            last_error: row.get(6)?,
                            created_at: row.get(7)?,
                            updated_at: row.get(8)?,
                            locked_until: row.get(9)?,
                        })
                    },
                )
                .optional()?;

            let Some(entry) = entry else {
                tx.commit()?;
                return Ok(None);
            };

            let locked_until: String = tx.query_row(
                "UPDATE queue SET status = 'processing',
                 locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2
                 RETURNING locked_until",
                params![lease, entry.id],
                |row| row.get(0),
            )?;
            tx.commit()?;

            Ok(Some(QueueEntry {
                status: "processing".to_string(),
                locked_until: Some(locked_until),
                ..entry
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry completed.
pub async fn ack(db: &Database, id: i64) -> Result<(), InnkeepError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt.
///
/// Increments attempts. At `max_attempts` the entry moves to `failed`;
/// otherwise it returns to `pending` with its lock cleared.
pub async fn fail(db: &Database, id: i64, error: &str) -> Result<FailOutcome, InnkeepError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let attempts = attempts + 1;
            let (status, outcome) = if attempts >= max_attempts {
                ("failed", FailOutcome::Parked { attempts })
            } else {
                ("pending", FailOutcome::Retrying { attempts })
            };
            conn.execute(
                "UPDATE queue SET status = ?1, attempts = ?2, last_error = ?3,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?4",
                params![status, attempts, error, id],
            )?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Entries still awaiting delivery or in flight.
pub async fn pending_count(db: &Database, queue_name: &str) -> Result<u64, InnkeepError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM queue
                 WHERE queue_name = ?1 AND status IN ('pending', 'processing')",
                params![queue_name],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Delete completed and parked entries of `queue_name` last touched before `before`.
///
/// Returns the number of rows removed. Pending and leased entries are never touched.
pub async fn purge_finished(
    db: &Database,
    queue_name: &str,
    before: DateTime<Utc>,
) -> Result<u64, InnkeepError> {
    let queue_name = queue_name.to_string();
    let cutoff = format_timestamp(before);
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM queue
                 WHERE queue_name = ?1 AND status IN ('completed', 'failed') AND updated_at < ?2",
                params![queue_name, cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn status_of(db: &Database, id: i64) -> (String, i32, Option<String>) {
        db.connection()
            .call(move |conn| -> Result<(String, i32, Option<String>), rusqlite::Error> {
                conn.query_row(
                    "SELECT status, attempts, last_error FROM queue WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn enqueue_and_dequeue_lifecycle() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "slip_verification", r#"{"booking_id":"b1"}"#, 3)
            .await
            .unwrap();
        let entry = dequeue(&db, "slip_verification", 300).await.unwrap().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, "processing");
        assert!(entry.locked_until.is_some());
        assert_eq!(entry.payload, r#"{"booking_id":"b1"}"#);

        // Leased entries are not handed out twice.
        assert!(dequeue(&db, "slip_verification", 300).await.unwrap().is_none());
        assert_eq!(pending_count(&db, "slip_verification").await.unwrap(), 1);

        ack(&db, id).await.unwrap();
        assert_eq!(status_of(&db, id).await.0, "completed");
        assert_eq!(pending_count(&db, "slip_verification").await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_lease_is_redelivered() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "q", "payload", 3).await.unwrap();

        let first = dequeue(&db, "q", 300).await.unwrap().unwrap();
        assert_eq!(first.id, id);

        // Simulate a consumer that died after leasing.
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE queue SET locked_until = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![id],
                )
            })
            .await
            .unwrap();

        let again = dequeue(&db, "q", 300).await.unwrap().unwrap();
        assert_eq!(again.id, id);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fail_retries_then_parks() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "q", "payload", 2).await.unwrap();

        dequeue(&db, "q", 300).await.unwrap().unwrap();
        assert_eq!(
            fail(&db, id, "timeout").await.unwrap(),
            FailOutcome::Retrying { attempts: 1 }
        );
        let (status, attempts, last_error) = status_of(&db, id).await;
        assert_eq!(status, "pending");
        assert_eq!(attempts, 1);
        assert_eq!(last_error.as_deref(), Some("timeout"));

        dequeue(&db, "q", 300).await.unwrap().unwrap();
        assert_eq!(
            fail(&db, id, "timeout again").await.unwrap(),
            FailOutcome::Parked { attempts: 2 }
        );
        assert_eq!(status_of(&db, id).await.0, "failed");
        assert!(dequeue(&db, "q", 300).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_only_old_finished_entries() {
        let (db, _dir) = setup_db().await;
        let done = enqueue(&db, "q", "done", 1).await.unwrap();
        let parked = enqueue(&db, "q", "parked", 1).await.unwrap();
        let waiting = enqueue(&db, "q", "waiting", 1).await.unwrap();
        let other = enqueue(&db, "other", "done elsewhere", 1).await.unwrap();

        dequeue(&db, "q", 300).await.unwrap().unwrap();
        ack(&db, done).await.unwrap();
        dequeue(&db, "q", 300).await.unwrap().unwrap();
        fail(&db, parked, "bad payload").await.unwrap();
        dequeue(&db, "other", 300).await.unwrap().unwrap();
        ack(&db, other).await.unwrap();

        // Nothing finished before the epoch.
        let epoch = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        assert_eq!(purge_finished(&db, "q", epoch).await.unwrap(), 0);

        let later = Utc::now() + chrono::Duration::minutes(1);
        assert_eq!(purge_finished(&db, "q", later).await.unwrap(), 2);
        assert_eq!(status_of(&db, waiting).await.0, "pending");
        assert_eq!(status_of(&db, other).await.0, "completed");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn queues_are_isolated_by_name() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, "a", "1", 3).await.unwrap();
        assert!(dequeue(&db, "b", 300).await.unwrap().is_none());
        assert!(dequeue(&db, "a", 300).await.unwrap().is_some());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_enqueues_no_sqlite_busy() {
        let (db, _dir) = setup_db().await;

        let mut handles = Vec::new();
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                enqueue(&db, "q", &format!(r#"{{"n":{i}}}"#), 3).await
            }));
        }
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "concurrent enqueue failed: {result:?}");
        }
        assert_eq!(pending_count(&db, "q").await.unwrap(), 10);
        db.close().await.unwrap();
    }
}
