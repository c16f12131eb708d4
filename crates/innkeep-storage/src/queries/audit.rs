// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only booking audit log.
//!
//! The table rejects UPDATE and DELETE at the trigger level; the only write
//! path is [`append`], called inside the transaction of the change it records.

use innkeep_core::{AuditRecord, InnkeepError};
use rusqlite::{Connection, params};

use crate::database::{Database, map_tr_err};
use crate::models::{AUDIT_COLUMNS, NewAuditRecord, audit_from_row, format_timestamp, json_param};

/// Append one record. Returns its id.
pub fn append(conn: &Connection, record: &NewAuditRecord) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO booking_audit_log
            (booking_id, action, actor_id, before_snapshot, after_snapshot, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.booking_id,
            record.action.to_string(),
            record.actor_id,
            json_param(record.before.as_ref()),
            json_param(record.after.as_ref()),
            record.notes,
            format_timestamp(record.created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Full history of a booking, oldest first. Ties on timestamp keep insertion order.
pub fn history(conn: &Connection, booking_id: &str) -> rusqlite::Result<Vec<AuditRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {AUDIT_COLUMNS} FROM booking_audit_log
         WHERE booking_id = ?1
         ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![booking_id], audit_from_row)?;
    rows.collect()
}

pub async fn get_history(db: &Database, booking_id: &str) -> Result<Vec<AuditRecord>, InnkeepError> {
    let booking_id = booking_id.to_string();
    db.connection()
        .call(move |conn| history(conn, &booking_id))
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use innkeep_core::AuditAction;
    use serde_json::json;

    async fn db_with_booking() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        db.connection()
            .call(|conn| {
                conn.execute_batch(
                    "INSERT INTO room_categories (id, name, nightly_price_minor, max_occupancy)
                        VALUES (1, 'Deluxe', 100000, 2);
                     INSERT INTO rooms (id, category_id, room_number) VALUES (1, 1, '101');
                     INSERT INTO bookings (id, user_id, room_id, category_id, check_in_date,
                        check_out_date, guest_count, total_price_minor, payment_type,
                        payment_amount_minor, created_at, updated_at)
                     VALUES ('b1', 'u1', 1, 1, '2025-06-01', '2025-06-03', 2, 200000,
                        'deposit', 100000, '2025-05-01T00:00:00.000Z', '2025-05-01T00:00:00.000Z');",
                )
            })
            .await
            .unwrap();
        db
    }

    fn record(action: AuditAction, second: u32) -> NewAuditRecord {
        NewAuditRecord {
            booking_id: "b1".to_string(),
            action,
            actor_id: Some("u1".to_string()),
            before: None,
            after: Some(json!({"status": "confirmed"})),
            notes: None,
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, second).unwrap(),
        }
    }

    #[tokio::test]
    async fn history_is_ordered_by_time_then_id() {
        let db = db_with_booking().await;
        db.connection()
            .call(|conn| {
                append(conn, &record(AuditAction::SlipUploaded, 5))?;
                append(conn, &record(AuditAction::BookingCreated, 0))?;
                append(conn, &record(AuditAction::SlipokVerified, 5))
            })
            .await
            .unwrap();

        let history = get_history(&db, "b1").await.unwrap();
        let actions: Vec<_> = history.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::BookingCreated,
                AuditAction::SlipUploaded,
                AuditAction::SlipokVerified
            ]
        );
        assert_eq!(history[0].after, Some(json!({"status": "confirmed"})));
        assert!(history[0].before.is_none());
    }

    #[tokio::test]
    async fn audit_rows_cannot_be_changed_or_removed() {
        let db = db_with_booking().await;
        let id = db
            .connection()
            .call(|conn| append(conn, &record(AuditAction::BookingCreated, 0)))
            .await
            .unwrap();

        let update = db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE booking_audit_log SET notes = 'edited' WHERE id = ?1",
                    params![id],
                )
            })
            .await;
        assert!(update.is_err());

        let delete = db
            .connection()
            .call(move |conn| conn.execute("DELETE FROM booking_audit_log WHERE id = ?1", params![id]))
            .await;
        assert!(delete.is_err());

        assert_eq!(get_history(&db, "b1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_booking_has_empty_history() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_history(&db, "missing").await.unwrap().is_empty());
    }
}
