// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit trail for booking transitions.
//!
//! Records are appended inside the transaction of the change they describe,
//! so a rolled-back change leaves no record behind. Snapshots hold only the
//! fields the action touches.

use chrono::{DateTime, Utc};
use innkeep_core::{AuditAction, AuditRecord, Booking, BookingError, InnkeepError};
use innkeep_storage::models::NewAuditRecord;
use innkeep_storage::queries::audit;
use innkeep_storage::sql_err;
use serde_json::{Value, json};

use crate::engine::BookingEngine;

/// One audit entry about to be written.
pub(crate) struct Entry<'a> {
    pub action: AuditAction,
    pub actor: Option<&'a str>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub notes: Option<&'a str>,
}

pub(crate) fn append(
    conn: &rusqlite::Connection,
    booking_id: &str,
    entry: Entry<'_>,
    at: DateTime<Utc>,
) -> Result<i64, BookingError> {
    let record = NewAuditRecord {
        booking_id: booking_id.to_string(),
        action: entry.action,
        actor_id: entry.actor.map(str::to_string),
        before: entry.before,
        after: entry.after,
        notes: entry.notes.map(str::to_string),
        created_at: at,
    };
    audit::append(conn, &record).map_err(sql_err).map_err(BookingError::from)
}

pub(crate) fn full_snapshot(booking: &Booking) -> Result<Value, BookingError> {
    serde_json::to_value(booking)
        .map_err(|e| InnkeepError::Internal(format!("failed to snapshot booking: {e}")).into())
}

pub(crate) fn status_snapshot(b: &Booking) -> Value {
    json!({
        "status": b.status,
        "cancelled_at": b.cancelled_at,
        "cancellation_reason": b.cancellation_reason,
        "cancelled_by": b.cancelled_by,
        "cancelled_by_admin": b.cancelled_by_admin,
    })
}

pub(crate) fn slip_snapshot(b: &Booking) -> Value {
    json!({
        "slip_image_url": b.slip_image_url,
        "slip_uploaded_at": b.slip_uploaded_at,
        "slipok_status": b.slipok_status,
        "slipok_verified_at": b.slipok_verified_at,
    })
}

pub(crate) fn admin_snapshot(b: &Booking) -> Value {
    json!({
        "admin_status": b.admin_status,
        "admin_verified_at": b.admin_verified_at,
        "admin_verified_by": b.admin_verified_by,
        "admin_notes": b.admin_notes,
    })
}

pub(crate) fn stay_snapshot(b: &Booking) -> Value {
    json!({
        "check_in": b.check_in,
        "check_out": b.check_out,
        "guest_count": b.guest_count,
        "notes": b.notes,
        "total_price": b.total_price,
        "original_total": b.original_total,
        "discount_amount": b.discount_amount,
        "payment_amount": b.payment_amount,
        "points_earned": b.points_earned,
    })
}

pub(crate) fn financial_snapshot(b: &Booking) -> Value {
    json!({
        "total_price": b.total_price,
        "discount_amount": b.discount_amount,
        "discount_reason": b.discount_reason,
        "original_total": b.original_total,
        "payment_amount": b.payment_amount,
    })
}

impl BookingEngine {
    /// Append a free-form audit record for an existing booking.
    ///
    /// The booking operations log their own transitions; this is for callers
    /// that need to record an out-of-band event against a booking.
    pub async fn log_action(
        &self,
        booking_id: &str,
        action: AuditAction,
        actor_id: Option<&str>,
        before: Option<Value>,
        after: Option<Value>,
        notes: Option<&str>,
    ) -> Result<i64, BookingError> {
        let booking_id = booking_id.to_string();
        let actor_id = actor_id.map(str::to_string);
        let notes = notes.map(str::to_string);
        let at = self.now();
        self.write(move |tx| {
            if innkeep_storage::queries::bookings::booking_by_id(tx, &booking_id)
                .map_err(sql_err)?
                .is_none()
            {
                return Err(BookingError::not_found("booking", booking_id));
            }
            append(
                tx,
                &booking_id,
                Entry {
                    action,
                    actor: actor_id.as_deref(),
                    before,
                    after,
                    notes: notes.as_deref(),
                },
                at,
            )
        })
        .await
    }

    /// All audit records of a booking, oldest first.
    pub async fn get_audit_history(&self, booking_id: &str) -> Result<Vec<AuditRecord>, BookingError> {
        let booking_id = booking_id.to_string();
        self.read(move |conn| audit::history(conn, &booking_id).map_err(|e| sql_err(e).into()))
            .await
    }
}
