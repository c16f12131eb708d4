// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room catalog and availability queries.

use chrono::NaiveDate;
use innkeep_core::{CategoryAvailability, InnkeepError, Room, RoomCategory};
use rust_decimal::Decimal;
use rusqlite::{Connection, OptionalExtension, named_params, params};

use crate::database::{Database, map_tr_err};
use crate::models::{
    BlockedDate, CATEGORY_COLUMNS, ROOM_COLUMNS, category_from_row, format_date, get_date,
    money_param, room_from_row,
};

/// A room `r` is free over `[:check_in, :check_out)`: no blocked date inside
/// the range and no confirmed booking whose half-open interval overlaps it.
const ROOM_IS_FREE: &str = "r.active = 1
    AND NOT EXISTS (
        SELECT 1 FROM blocked_dates d
        WHERE d.room_id = r.id AND d.date >= :check_in AND d.date < :check_out
    )
    AND NOT EXISTS (
        SELECT 1 FROM bookings b
        WHERE b.room_id = r.id
          AND b.status = 'confirmed'
          AND b.check_in_date < :check_out
          AND b.check_out_date > :check_in
    )";

/// Rooms of `category_id` free for the stay, ordered by room number.
///
/// The range must already be validated (`check_in < check_out`).
pub fn available_rooms_in(
    conn: &Connection,
    category_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> rusqlite::Result<Vec<Room>> {
    let sql = format!(
        "SELECT {ROOM_COLUMNS} FROM rooms r
         WHERE r.category_id = :category_id AND {ROOM_IS_FREE}
         ORDER BY r.room_number ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        named_params! {
            ":category_id": category_id,
            ":check_in": format_date(check_in),
            ":check_out": format_date(check_out),
        },
        room_from_row,
    )?;
    rows.collect()
}

/// True if `room_id` has a blocked date inside `[check_in, check_out)`.
pub fn room_blocked_in(
    conn: &Connection,
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM blocked_dates
            WHERE room_id = ?1 AND date >= ?2 AND date < ?3
         )",
        params![room_id, format_date(check_in), format_date(check_out)],
        |row| row.get(0),
    )
}

pub async fn available_rooms(
    db: &Database,
    category_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<Vec<Room>, InnkeepError> {
    db.connection()
        .call(move |conn| available_rooms_in(conn, category_id, check_in, check_out))
        .await
        .map_err(map_tr_err)
}

/// Per active category: active room count and free room count for the stay.
pub fn categories_with_availability_in(
    conn: &Connection,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> rusqlite::Result<Vec<CategoryAvailability>> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS},
            (SELECT COUNT(*) FROM rooms r WHERE r.category_id = c.id AND r.active = 1),
            (SELECT COUNT(*) FROM rooms r WHERE r.category_id = c.id AND {ROOM_IS_FREE})
         FROM room_categories c
         WHERE c.active = 1
         ORDER BY c.name ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        named_params! {
            ":check_in": format_date(check_in),
            ":check_out": format_date(check_out),
        },
        |row| {
            Ok(CategoryAvailability {
                category: category_from_row(row)?,
                total_rooms: row.get(6)?,
                available_rooms: row.get(7)?,
            })
        },
    )?;
    rows.collect()
}

pub async fn categories_with_availability(
    db: &Database,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<Vec<CategoryAvailability>, InnkeepError> {
    db.connection()
        .call(move |conn| categories_with_availability_in(conn, check_in, check_out))
        .await
        .map_err(map_tr_err)
}

pub fn category_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<RoomCategory>> {
    conn.query_row(
        &format!("SELECT {CATEGORY_COLUMNS} FROM room_categories c WHERE c.id = ?1"),
        params![id],
        category_from_row,
    )
    .optional()
}

pub async fn get_category(db: &Database, id: i64) -> Result<Option<RoomCategory>, InnkeepError> {
    db.connection()
        .call(move |conn| category_by_id(conn, id))
        .await
        .map_err(map_tr_err)
}

/// Insert a new active category.
pub async fn insert_category(
    db: &Database,
    name: &str,
    description: Option<&str>,
    nightly_price: Decimal,
    max_occupancy: u32,
) -> Result<RoomCategory, InnkeepError> {
    let name = name.to_string();
    let description = description.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO room_categories (name, description, nightly_price_minor, max_occupancy)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, description, money_param(nightly_price)?, max_occupancy],
            )?;
            Ok(RoomCategory {
                id: conn.last_insert_rowid(),
                name,
                description,
                nightly_price,
                max_occupancy,
                active: true,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Update the admin-mutable fields of a category. Returns false if it does not exist.
pub async fn update_category(
    db: &Database,
    id: i64,
    nightly_price: Decimal,
    max_occupancy: u32,
    active: bool,
) -> Result<bool, InnkeepError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE room_categories
                 SET nightly_price_minor = ?1, max_occupancy = ?2, active = ?3
                 WHERE id = ?4",
                params![money_param(nightly_price)?, max_occupancy, active, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_room(
    db: &Database,
    category_id: i64,
    room_number: &str,
) -> Result<Room, InnkeepError> {
    let room_number = room_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO rooms (category_id, room_number) VALUES (?1, ?2)",
                params![category_id, room_number],
            )?;
            Ok(Room {
                id: conn.last_insert_rowid(),
                category_id,
                room_number,
                active: true,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Toggle bookability of a room. Returns false if the room does not exist.
pub async fn set_room_active(db: &Database, room_id: i64, active: bool) -> Result<bool, InnkeepError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE rooms SET active = ?1 WHERE id = ?2",
                params![active, room_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_room_by_number(
    db: &Database,
    room_number: &str,
) -> Result<Option<Room>, InnkeepError> {
    let room_number = room_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.room_number = ?1"),
                params![room_number],
                room_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Block a room for one date. Returns false if that date was already blocked.
pub async fn block_date(
    db: &Database,
    room_id: i64,
    date: NaiveDate,
    reason: Option<&str>,
) -> Result<bool, InnkeepError> {
    let reason = reason.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO blocked_dates (room_id, date, reason) VALUES (?1, ?2, ?3)",
                params![room_id, format_date(date), reason],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn unblock_date(db: &Database, room_id: i64, date: NaiveDate) -> Result<bool, InnkeepError> {
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM blocked_dates WHERE room_id = ?1 AND date = ?2",
                params![room_id, format_date(date)],
            )?;
            Ok(removed == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn blocked_dates_for_room(
    db: &Database,
    room_id: i64,
) -> Result<Vec<BlockedDate>, InnkeepError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT room_id, date, reason FROM blocked_dates WHERE room_id = ?1 ORDER BY date",
            )?;
            let rows = stmt.query_map(params![room_id], |row| {
                Ok(BlockedDate {
                    room_id: row.get(0)?,
                    date: get_date(row, 1)?,
                    reason: row.get(2)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)
}
