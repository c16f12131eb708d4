// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking persistence.

use chrono::{DateTime, Utc};
use innkeep_core::{Booking, BookingFilter, InnkeepError, SlipokStatus, SortField, SortOrder};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, named_params, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{
    BOOKING_COLUMNS, booking_from_row, format_date, format_timestamp, json_param, money_param,
    opt_money_param,
};

const FROM_BOOKINGS: &str = "FROM bookings b JOIN rooms r ON r.id = b.room_id";

/// Insert a new booking row. The overlap trigger may abort this.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bookings (
            id, user_id, room_id, category_id, check_in_date, check_out_date, guest_count, notes,
            total_price_minor, points_earned, discount_amount_minor, discount_reason,
            original_total_minor, payment_type, payment_amount_minor, status,
            slipok_status, admin_status, created_at, updated_at
         ) VALUES (
            :id, :user_id, :room_id, :category_id, :check_in, :check_out, :guest_count, :notes,
            :total, :points, :discount, :discount_reason,
            :original_total, :payment_type, :payment_amount, :status,
            :slipok_status, :admin_status, :created_at, :updated_at
         )",
        named_params! {
            ":id": booking.id,
            ":user_id": booking.user_id,
            ":room_id": booking.room_id,
            ":category_id": booking.category_id,
            ":check_in": format_date(booking.check_in),
            ":check_out": format_date(booking.check_out),
            ":guest_count": booking.guest_count,
            ":notes": booking.notes,
            ":total": money_param(booking.total_price)?,
            ":points": booking.points_earned,
            ":discount": money_param(booking.discount_amount)?,
            ":discount_reason": booking.discount_reason,
            ":original_total": opt_money_param(booking.original_total)?,
            ":payment_type": booking.payment_type.to_string(),
            ":payment_amount": money_param(booking.payment_amount)?,
            ":status": booking.status.to_string(),
            ":slipok_status": booking.slipok_status.to_string(),
            ":admin_status": booking.admin_status.to_string(),
            ":created_at": format_timestamp(booking.created_at),
            ":updated_at": format_timestamp(booking.updated_at),
        },
    )?;
    Ok(())
}

pub fn booking_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} {FROM_BOOKINGS} WHERE b.id = ?1"),
        params![id],
        booking_from_row,
    )
    .optional()
}

pub async fn get_booking(db: &Database, id: &str) -> Result<Option<Booking>, InnkeepError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| booking_by_id(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// Write back every mutable field of `booking`. Identity and room are immutable.
///
/// Returns false if no row matched. Moving the dates of a confirmed booking onto
/// another confirmed stay aborts in the overlap trigger.
pub fn save_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE bookings SET
            check_in_date = :check_in,
            check_out_date = :check_out,
            guest_count = :guest_count,
            notes = :notes,
            total_price_minor = :total,
            points_earned = :points,
            discount_amount_minor = :discount,
            discount_reason = :discount_reason,
            original_total_minor = :original_total,
            payment_type = :payment_type,
            payment_amount_minor = :payment_amount,
            status = :status,
            cancelled_at = :cancelled_at,
            cancellation_reason = :cancellation_reason,
            cancelled_by = :cancelled_by,
            cancelled_by_admin = :cancelled_by_admin,
            slip_image_url = :slip_image_url,
            slip_uploaded_at = :slip_uploaded_at,
            slipok_status = :slipok_status,
            slipok_verified_at = :slipok_verified_at,
            slipok_response = :slipok_response,
            admin_status = :admin_status,
            admin_verified_at = :admin_verified_at,
            admin_verified_by = :admin_verified_by,
            admin_notes = :admin_notes,
            updated_at = :updated_at
         WHERE id = :id",
        named_params! {
            ":id": booking.id,
            ":check_in": format_date(booking.check_in),
            ":check_out": format_date(booking.check_out),
            ":guest_count": booking.guest_count,
            ":notes": booking.notes,
            ":total": money_param(booking.total_price)?,
            ":points": booking.points_earned,
            ":discount": money_param(booking.discount_amount)?,
            ":discount_reason": booking.discount_reason,
            ":original_total": opt_money_param(booking.original_total)?,
            ":payment_type": booking.payment_type.to_string(),
            ":payment_amount": money_param(booking.payment_amount)?,
            ":status": booking.status.to_string(),
            ":cancelled_at": booking.cancelled_at.map(format_timestamp),
            ":cancellation_reason": booking.cancellation_reason,
            ":cancelled_by": booking.cancelled_by,
            ":cancelled_by_admin": booking.cancelled_by_admin,
            ":slip_image_url": booking.slip_image_url,
            ":slip_uploaded_at": booking.slip_uploaded_at.map(format_timestamp),
            ":slipok_status": booking.slipok_status.to_string(),
            ":slipok_verified_at": booking.slipok_verified_at.map(format_timestamp),
            ":slipok_response": json_param(booking.slipok_response.as_ref()),
            ":admin_status": booking.admin_status.to_string(),
            ":admin_verified_at": booking.admin_verified_at.map(format_timestamp),
            ":admin_verified_by": booking.admin_verified_by,
            ":admin_notes": booking.admin_notes,
            ":updated_at": format_timestamp(booking.updated_at),
        },
    )?;
    Ok(changed == 1)
}

/// Compare-and-set of the automatic verification result.
///
/// Writes only if the booking still carries `expected_url` and `from_status`,
/// so a result for a replaced slip or an already-settled slip is a no-op.
#[allow(clippy::too_many_arguments)]
pub fn set_slipok_result(
    conn: &Connection,
    id: &str,
    expected_url: &str,
    from_status: SlipokStatus,
    new_status: SlipokStatus,
    verified_at: Option<DateTime<Utc>>,
    response: &serde_json::Value,
    updated_at: DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE bookings SET
            slipok_status = ?1,
            slipok_verified_at = ?2,
            slipok_response = ?3,
            updated_at = ?4
         WHERE id = ?5 AND slip_image_url = ?6 AND slipok_status = ?7",
        params![
            new_status.to_string(),
            verified_at.map(format_timestamp),
            response.to_string(),
            format_timestamp(updated_at),
            id,
            expected_url,
            from_status.to_string(),
        ],
    )?;
    Ok(changed == 1)
}

/// One page of bookings matching `filter`, with the total match count.
pub fn list_bookings_in(
    conn: &Connection,
    filter: &BookingFilter,
) -> rusqlite::Result<(Vec<Booking>, u64)> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(user_id) = &filter.user_id {
        clauses.push("b.user_id = ?");
        args.push(Value::Text(user_id.clone()));
    }
    if let Some(status) = filter.status {
        clauses.push("b.status = ?");
        args.push(Value::Text(status.to_string()));
    }
    if let Some(status) = filter.slipok_status {
        clauses.push("b.slipok_status = ?");
        args.push(Value::Text(status.to_string()));
    }
    if let Some(status) = filter.admin_status {
        clauses.push("b.admin_status = ?");
        args.push(Value::Text(status.to_string()));
    }
    if let Some(from) = filter.check_in_from {
        clauses.push("b.check_in_date >= ?");
        args.push(Value::Text(format_date(from)));
    }
    if let Some(to) = filter.check_in_to {
        clauses.push("b.check_in_date <= ?");
        args.push(Value::Text(format_date(to)));
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        clauses.push(
            "(b.id LIKE ? ESCAPE '\\' OR r.room_number LIKE ? ESCAPE '\\' \
             OR b.user_id LIKE ? ESCAPE '\\' OR b.notes LIKE ? ESCAPE '\\')",
        );
        let pattern = format!("%{}%", escape_like(term));
        for _ in 0..4 {
            args.push(Value::Text(pattern.clone()));
        }
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) {FROM_BOOKINGS} {where_sql}"),
        params_from_iter(args.iter()),
        |row| row.get(0),
    )?;

    let sort_col = match filter.sort {
        SortField::CreatedAt => "b.created_at",
        SortField::CheckIn => "b.check_in_date",
        SortField::TotalPrice => "b.total_price_minor",
    };
    let direction = match filter.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let per_page = filter.per_page.max(1);
    let offset = u64::from(filter.page.max(1) - 1) * u64::from(per_page);

    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} {FROM_BOOKINGS} {where_sql}
         ORDER BY {sort_col} {direction}, b.id {direction}
         LIMIT {per_page} OFFSET {offset}"
    ))?;
    let rows = stmt.query_map(params_from_iter(args.iter()), booking_from_row)?;
    let items = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((items, total))
}

pub async fn list_bookings(
    db: &Database,
    filter: &BookingFilter,
) -> Result<(Vec<Booking>, u64), InnkeepError> {
    let filter = filter.clone();
    db.connection()
        .call(move |conn| list_bookings_in(conn, &filter))
        .await
        .map_err(map_tr_err)
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::is_overlap_violation;
    use chrono::{NaiveDate, TimeZone};
    use innkeep_core::{AdminStatus, BookingStatus, PaymentType};
    use rust_decimal::Decimal;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn seeded() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        db.connection()
            .call(|conn| {
                conn.execute_batch(
                    "INSERT INTO room_categories (id, name, nightly_price_minor, max_occupancy)
                        VALUES (1, 'Deluxe', 100000, 2);
                     INSERT INTO rooms (id, category_id, room_number) VALUES (1, 1, '101');
                     INSERT INTO rooms (id, category_id, room_number) VALUES (2, 1, '102');",
                )
            })
            .await
            .unwrap();
        db
    }

    fn booking(id: &str, room_id: i64, check_in: &str, check_out: &str) -> Booking {
        let created = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        Booking {
            id: id.to_string(),
            user_id: "u1".to_string(),
            room_id,
            room_number: if room_id == 1 { "101" } else { "102" }.to_string(),
            category_id: 1,
            check_in: date(check_in),
            check_out: date(check_out),
            guest_count: 2,
            notes: None,
            total_price: Decimal::from(2000),
            points_earned: 20,
            discount_amount: Decimal::ZERO,
            discount_reason: None,
            original_total: None,
            payment_type: PaymentType::Deposit,
            payment_amount: Decimal::from(1000),
            status: BookingStatus::Confirmed,
            cancelled_at: None,
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_by_admin: false,
            slip_image_url: None,
            slip_uploaded_at: None,
            slipok_status: SlipokStatus::Pending,
            slipok_verified_at: None,
            slipok_response: None,
            admin_status: AdminStatus::Pending,
            admin_verified_at: None,
            admin_verified_by: None,
            admin_notes: None,
            created_at: created,
            updated_at: created,
        }
    }

    async fn insert(db: &Database, b: Booking) -> rusqlite::Result<()> {
        db.connection()
            .call(move |conn| insert_booking(conn, &b))
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => panic!("connection error: {other}"),
            })
    }

    async fn save(db: &Database, b: Booking) -> rusqlite::Result<bool> {
        db.connection()
            .call(move |conn| save_booking(conn, &b))
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => panic!("connection error: {other}"),
            })
    }

    #[tokio::test]
    async fn insert_and_load_round_trip() {
        let db = seeded().await;
        let b = booking("b1", 1, "2025-06-01", "2025-06-03");
        insert(&db, b.clone()).await.unwrap();
        assert_eq!(get_booking(&db, "b1").await.unwrap(), Some(b));
        assert!(get_booking(&db, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overlapping_confirmed_booking_is_rejected() {
        let db = seeded().await;
        insert(&db, booking("b1", 1, "2025-06-01", "2025-06-03")).await.unwrap();

        let err = insert(&db, booking("b2", 1, "2025-06-02", "2025-06-04"))
            .await
            .unwrap_err();
        assert!(is_overlap_violation(&err), "unexpected error: {err}");

        // Back-to-back stays share only the changeover day.
        insert(&db, booking("b3", 1, "2025-06-03", "2025-06-05")).await.unwrap();
        // Other rooms are unaffected.
        insert(&db, booking("b4", 2, "2025-06-01", "2025-06-03")).await.unwrap();
    }

    #[tokio::test]
    async fn moving_dates_onto_another_stay_is_rejected() {
        let db = seeded().await;
        let b1 = booking("b1", 1, "2025-06-01", "2025-06-03");
        insert(&db, b1.clone()).await.unwrap();
        insert(&db, booking("b2", 1, "2025-06-05", "2025-06-07")).await.unwrap();

        // Overlapping only itself is fine.
        let mut shifted = b1.clone();
        shifted.check_in = date("2025-06-02");
        shifted.check_out = date("2025-06-05");
        assert!(save(&db, shifted).await.unwrap());

        let mut clash = b1;
        clash.check_out = date("2025-06-06");
        let err = save(&db, clash).await.unwrap_err();
        assert!(is_overlap_violation(&err), "unexpected error: {err}");

        let stored = get_booking(&db, "b1").await.unwrap().unwrap();
        assert_eq!(stored.check_in, date("2025-06-02"));
        assert_eq!(stored.check_out, date("2025-06-05"));
    }

    #[tokio::test]
    async fn cancelled_booking_frees_the_interval() {
        let db = seeded().await;
        let mut b = booking("b1", 1, "2025-06-01", "2025-06-03");
        insert(&db, b.clone()).await.unwrap();

        b.status = BookingStatus::Cancelled;
        b.cancelled_at = Some(Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap());
        let saved = db
            .connection()
            .call(move |conn| save_booking(conn, &b))
            .await
            .unwrap();
        assert!(saved);

        insert(&db, booking("b2", 1, "2025-06-01", "2025-06-03")).await.unwrap();
    }

    #[tokio::test]
    async fn slipok_result_requires_matching_url_and_status() {
        let db = seeded().await;
        let mut b = booking("b1", 1, "2025-06-01", "2025-06-03");
        b.slip_image_url = Some("/uploads/slip-2.jpg".to_string());
        insert(&db, b.clone()).await.unwrap();
        db.connection()
            .call(move |conn| save_booking(conn, &b))
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2025, 5, 3, 0, 0, 0).unwrap();
        let response = serde_json::json!({"success": true});
        let (stale, applied, repeat) = db
            .connection()
            .call(move |conn| {
                let stale = set_slipok_result(
                    conn, "b1", "/uploads/slip-1.jpg", SlipokStatus::Pending,
                    SlipokStatus::Verified, Some(now), &response, now,
                )?;
                let applied = set_slipok_result(
                    conn, "b1", "/uploads/slip-2.jpg", SlipokStatus::Pending,
                    SlipokStatus::Verified, Some(now), &response, now,
                )?;
                let repeat = set_slipok_result(
                    conn, "b1", "/uploads/slip-2.jpg", SlipokStatus::Pending,
                    SlipokStatus::Failed, None, &response, now,
                )?;
                Ok::<_, rusqlite::Error>((stale, applied, repeat))
            })
            .await
            .unwrap();
        assert!(!stale);
        assert!(applied);
        assert!(!repeat);

        let loaded = get_booking(&db, "b1").await.unwrap().unwrap();
        assert_eq!(loaded.slipok_status, SlipokStatus::Verified);
        assert_eq!(loaded.slipok_verified_at, Some(now));
        assert_eq!(loaded.slipok_response, Some(serde_json::json!({"success": true})));
    }

    #[tokio::test]
    async fn list_filters_sorts_and_paginates() {
        let db = seeded().await;
        let mut a = booking("a", 1, "2025-06-01", "2025-06-03");
        a.total_price = Decimal::from(3000);
        let mut b = booking("b", 2, "2025-06-05", "2025-06-06");
        b.user_id = "u2".to_string();
        b.notes = Some("late 50% arrival".to_string());
        let c = booking("c", 1, "2025-07-01", "2025-07-02");
        for item in [a, b, c] {
            insert(&db, item).await.unwrap();
        }

        let filter = BookingFilter {
            sort: SortField::TotalPrice,
            order: SortOrder::Desc,
            per_page: 2,
            ..Default::default()
        };
        let (items, total) = list_bookings(&db, &filter).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");

        let page2 = BookingFilter { page: 2, ..filter };
        let (items, total) = list_bookings(&db, &page2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 1);

        let by_room = BookingFilter {
            search: Some("102".to_string()),
            ..Default::default()
        };
        let (items, _) = list_bookings(&db, &by_room).await.unwrap();
        assert_eq!(items.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), ["b"]);

        // Wildcards in the search term match literally.
        let literal = BookingFilter {
            search: Some("50%".to_string()),
            ..Default::default()
        };
        assert_eq!(list_bookings(&db, &literal).await.unwrap().1, 1);

        let ranged = BookingFilter {
            check_in_from: Some(date("2025-06-02")),
            check_in_to: Some(date("2025-06-30")),
            sort: SortField::CheckIn,
            order: SortOrder::Asc,
            ..Default::default()
        };
        let (items, _) = list_bookings(&db, &ranged).await.unwrap();
        assert_eq!(items.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), ["b"]);
    }
}
