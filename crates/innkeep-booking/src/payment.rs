// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slip upload and automatic verification results.
//!
//! Uploading a slip resets verification to `pending` and enqueues a
//! [`VerificationJob`] in the same transaction. The worker later feeds the
//! provider's answer back through [`BookingEngine::apply_verification_result`],
//! which is idempotent and ignores results for slips that have been replaced.

use chrono::{DateTime, Utc};
use innkeep_core::{
    AuditAction, Booking, BookingError, BookingStatus, InnkeepError, SlipokStatus,
    VerificationOutcome,
};
use innkeep_storage::queries::{bookings, queue};
use innkeep_storage::sql_err;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{self, Entry};
use crate::engine::BookingEngine;
use crate::lifecycle::{load_booking, save};

/// Queue carrying verification jobs.
pub const VERIFICATION_QUEUE: &str = "slip_verification";

/// Verify the slip at `slip_image_url` for `booking_id`.
///
/// The URL pins the job to one upload; a result for an older upload is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationJob {
    pub booking_id: String,
    pub slip_image_url: String,
}

/// What applying a verification result did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Status changed and one audit record was appended.
    Applied,
    /// The booking already had this status; nothing written.
    Unchanged,
    /// The slip was replaced or already settled differently; nothing written.
    Stale,
}

/// Slip fields for a new or replacement upload, applied inside `tx`.
pub(crate) struct SlipUpload<'a> {
    pub image_url: &'a str,
    pub actor: &'a str,
    pub notes: Option<&'a str>,
    /// Record as a replacement even when no slip was attached before.
    pub replacing: bool,
    pub max_attempts: i32,
    pub at: DateTime<Utc>,
}

/// Attach a slip, reset verification, append the audit record, and enqueue the job.
pub(crate) fn attach_slip(
    conn: &Connection,
    booking: &mut Booking,
    upload: SlipUpload<'_>,
) -> Result<(), BookingError> {
    if booking.status == BookingStatus::Cancelled {
        return Err(BookingError::Validation(
            "cannot attach a slip to a cancelled booking".into(),
        ));
    }

    let before = audit::slip_snapshot(booking);
    let action = if upload.replacing || booking.slip_image_url.is_some() {
        AuditAction::SlipReplaced
    } else {
        AuditAction::SlipUploaded
    };

    booking.slip_image_url = Some(upload.image_url.to_string());
    booking.slip_uploaded_at = Some(upload.at);
    booking.slipok_status = SlipokStatus::Pending;
    booking.slipok_verified_at = None;
    booking.slipok_response = None;
    booking.updated_at = upload.at;
    save(conn, booking)?;

    audit::append(
        conn,
        &booking.id,
        Entry {
            action,
            actor: Some(upload.actor),
            before: Some(before),
            after: Some(audit::slip_snapshot(booking)),
            notes: upload.notes,
        },
        upload.at,
    )?;

    let job = VerificationJob {
        booking_id: booking.id.clone(),
        slip_image_url: upload.image_url.to_string(),
    };
    let payload = serde_json::to_string(&job)
        .map_err(|e| InnkeepError::Internal(format!("failed to encode verification job: {e}")))?;
    queue::enqueue_in(conn, VERIFICATION_QUEUE, &payload, upload.max_attempts).map_err(sql_err)?;
    Ok(())
}

pub(crate) fn require_url(image_url: &str) -> Result<String, BookingError> {
    let trimmed = image_url.trim();
    if trimmed.is_empty() {
        return Err(BookingError::Validation("slip image URL is required".into()));
    }
    Ok(trimmed.to_string())
}

impl BookingEngine {
    /// Attach a payment slip on behalf of the booking owner.
    ///
    /// Returns once the slip is stored and verification is queued; the
    /// returned booking is still `pending`.
    pub async fn upload_slip(
        &self,
        booking_id: &str,
        image_url: &str,
        actor_user_id: &str,
    ) -> Result<Booking, BookingError> {
        let image_url = require_url(image_url)?;
        let booking_id = booking_id.to_string();
        let actor = actor_user_id.to_string();
        let max_attempts = self.policy.verification_max_attempts;
        let now = self.now();

        let booking = self
            .write(move |tx| {
                let mut booking = load_booking(tx, &booking_id)?;
                if booking.user_id != actor {
                    return Err(BookingError::Forbidden(
                        "only the booking owner can upload a slip".into(),
                    ));
                }
                attach_slip(
                    tx,
                    &mut booking,
                    SlipUpload {
                        image_url: &image_url,
                        actor: &actor,
                        notes: None,
                        replacing: false,
                        max_attempts,
                        at: now,
                    },
                )?;
                Ok(booking)
            })
            .await?;

        self.verification_ready.notify_one();
        info!(booking_id = %booking.id, "slip uploaded, verification queued");
        Ok(booking)
    }

    /// Record an automatic verification result for the slip named in `job`.
    ///
    /// Idempotent: re-delivering a result that is already recorded writes
    /// nothing. A result for a replaced slip, or one that contradicts an
    /// already-settled status, is discarded as stale.
    pub async fn apply_verification_result(
        &self,
        job: &VerificationJob,
        outcome: &VerificationOutcome,
    ) -> Result<ApplyOutcome, BookingError> {
        let Some(action) = AuditAction::for_slipok_status(outcome.status) else {
            return Err(BookingError::Validation(
                "pending is not a verification result".into(),
            ));
        };

        let booking_id = job.booking_id.clone();
        let status = outcome.status;
        let job = job.clone();
        let outcome = outcome.clone();
        let now = self.now();

        let applied = self
            .write(move |tx| {
                let mut booking = load_booking(tx, &job.booking_id)?;
                if booking.slip_image_url.as_deref() != Some(job.slip_image_url.as_str()) {
                    return Ok(ApplyOutcome::Stale);
                }
                if booking.slipok_status == outcome.status {
                    return Ok(ApplyOutcome::Unchanged);
                }
                if booking.slipok_status.is_terminal() {
                    return Ok(ApplyOutcome::Stale);
                }

                let before = audit::slip_snapshot(&booking);
                let verified_at = (outcome.status == SlipokStatus::Verified).then_some(now);
                let written = bookings::set_slipok_result(
                    tx,
                    &booking.id,
                    &job.slip_image_url,
                    SlipokStatus::Pending,
                    outcome.status,
                    verified_at,
                    &outcome.raw_response,
                    now,
                )
                .map_err(sql_err)?;
                if !written {
                    return Ok(ApplyOutcome::Stale);
                }

                booking.slipok_status = outcome.status;
                booking.slipok_verified_at = verified_at;
                booking.slipok_response = Some(outcome.raw_response.clone());
                booking.updated_at = now;
                audit::append(
                    tx,
                    &booking.id,
                    Entry {
                        action,
                        actor: None,
                        before: Some(before),
                        after: Some(audit::slip_snapshot(&booking)),
                        notes: outcome.error_message.as_deref(),
                    },
                    now,
                )?;
                Ok(ApplyOutcome::Applied)
            })
            .await?;

        match applied {
            ApplyOutcome::Applied => info!(%booking_id, %status, "slip verification recorded"),
            ApplyOutcome::Unchanged => {
                info!(%booking_id, %status, "verification result already recorded")
            }
            ApplyOutcome::Stale => {
                warn!(%booking_id, %status, "discarding stale verification result")
            }
        }
        Ok(applied)
    }
}
