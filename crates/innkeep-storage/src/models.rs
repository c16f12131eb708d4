// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strict row-to-entity mapping.
//!
//! Every column is decoded into its domain type at the boundary. Unknown enum
//! values, malformed dates, and NULLs in non-nullable columns fail the read
//! with a conversion error instead of being coalesced.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use innkeep_core::money;
use innkeep_core::{AuditAction, AuditRecord, Booking, Room, RoomCategory};
use rusqlite::Row;
use rusqlite::types::Type;
use rust_decimal::Decimal;

pub use innkeep_core::types::BlockedDate;

/// A queue entry for crash-safe background processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}

/// Audit record before insertion (no id yet).
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditRecord {
    pub booking_id: String,
    pub action: AuditAction,
    pub actor_id: Option<String>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Timestamps are stored as RFC 3339 UTC with millisecond precision.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Money parameter in minor units; out-of-range amounts fail the write.
pub fn money_param(value: Decimal) -> rusqlite::Result<i64> {
    money::to_minor_units(value).ok_or_else(|| {
        rusqlite::Error::ToSqlConversionFailure(
            format!("amount {value} out of range").into(),
        )
    })
}

pub fn opt_money_param(value: Option<Decimal>) -> rusqlite::Result<Option<i64>> {
    value.map(money_param).transpose()
}

pub fn json_param(value: Option<&serde_json::Value>) -> Option<String> {
    value.map(|v| v.to_string())
}

pub(crate) fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

pub(crate) fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_err(idx, e))
}

pub(crate) fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_err(idx, e))
}

pub(crate) fn get_opt_timestamp(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_timestamp(&s).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

pub(crate) fn get_money(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let minor: i64 = row.get(idx)?;
    Ok(money::from_minor_units(minor))
}

pub(crate) fn get_opt_money(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let minor: Option<i64> = row.get(idx)?;
    Ok(minor.map(money::from_minor_units))
}

pub(crate) fn get_opt_json(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<serde_json::Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

pub const CATEGORY_COLUMNS: &str =
    "c.id, c.name, c.description, c.nightly_price_minor, c.max_occupancy, c.active";

pub(crate) fn category_from_row(row: &Row<'_>) -> rusqlite::Result<RoomCategory> {
    Ok(RoomCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        nightly_price: get_money(row, 3)?,
        max_occupancy: row.get(4)?,
        active: row.get(5)?,
    })
}

pub const ROOM_COLUMNS: &str = "r.id, r.category_id, r.room_number, r.active";

pub(crate) fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        category_id: row.get(1)?,
        room_number: row.get(2)?,
        active: row.get(3)?,
    })
}

/// Booking columns joined with the room number. Use with `FROM bookings b JOIN rooms r`.
pub const BOOKING_COLUMNS: &str = "b.id, b.user_id, b.room_id, r.room_number, b.category_id, \
     b.check_in_date, b.check_out_date, b.guest_count, b.notes, \
     b.total_price_minor, b.points_earned, b.discount_amount_minor, b.discount_reason, \
     b.original_total_minor, b.payment_type, b.payment_amount_minor, \
     b.status, b.cancelled_at, b.cancellation_reason, b.cancelled_by, b.cancelled_by_admin, \
     b.slip_image_url, b.slip_uploaded_at, b.slipok_status, b.slipok_verified_at, b.slipok_response, \
     b.admin_status, b.admin_verified_at, b.admin_verified_by, b.admin_notes, \
     b.created_at, b.updated_at";

pub(crate) fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        room_id: row.get(2)?,
        room_number: row.get(3)?,
        category_id: row.get(4)?,
        check_in: get_date(row, 5)?,
        check_out: get_date(row, 6)?,
        guest_count: row.get(7)?,
        notes: row.get(8)?,
        total_price: get_money(row, 9)?,
        points_earned: row.get(10)?,
        discount_amount: get_money(row, 11)?,
        discount_reason: row.get(12)?,
        original_total: get_opt_money(row, 13)?,
        payment_type: get_enum(row, 14)?,
        payment_amount: get_money(row, 15)?,
        status: get_enum(row, 16)?,
        cancelled_at: get_opt_timestamp(row, 17)?,
        cancellation_reason: row.get(18)?,
        cancelled_by: row.get(19)?,
        cancelled_by_admin: row.get(20)?,
        slip_image_url: row.get(21)?,
        slip_uploaded_at: get_opt_timestamp(row, 22)?,
        slipok_status: get_enum(row, 23)?,
        slipok_verified_at: get_opt_timestamp(row, 24)?,
        slipok_response: get_opt_json(row, 25)?,
        admin_status: get_enum(row, 26)?,
        admin_verified_at: get_opt_timestamp(row, 27)?,
        admin_verified_by: row.get(28)?,
        admin_notes: row.get(29)?,
        created_at: get_timestamp(row, 30)?,
        updated_at: get_timestamp(row, 31)?,
    })
}

pub const AUDIT_COLUMNS: &str =
    "id, booking_id, action, actor_id, before_snapshot, after_snapshot, notes, created_at";

pub(crate) fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    Ok(AuditRecord {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        action: get_enum(row, 2)?,
        actor_id: row.get(3)?,
        before: get_opt_json(row, 4)?,
        after: get_opt_json(row, 5)?,
        notes: row.get(6)?,
        created_at: get_timestamp(row, 7)?,
    })
}
