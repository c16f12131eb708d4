// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff overrides of payment verification.

use innkeep_core::{AdminStatus, AuditAction, Booking, BookingError};
use tracing::info;

use crate::audit::{self, Entry};
use crate::engine::BookingEngine;
use crate::lifecycle::{load_booking, save};
use crate::payment::{SlipUpload, attach_slip, require_url};

fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

impl BookingEngine {
    /// Mark the payment as checked by staff, whatever the automatic result was.
    pub async fn admin_verify_slip(
        &self,
        booking_id: &str,
        admin_id: &str,
        notes: Option<&str>,
    ) -> Result<Booking, BookingError> {
        self.set_admin_status(booking_id, admin_id, AdminStatus::Verified, clean_notes(notes))
            .await
    }

    /// Flag the payment for follow-up. Notes are required.
    pub async fn admin_mark_needs_action(
        &self,
        booking_id: &str,
        admin_id: &str,
        notes: &str,
    ) -> Result<Booking, BookingError> {
        let Some(notes) = clean_notes(Some(notes)) else {
            return Err(BookingError::Validation(
                "notes are required when flagging a booking".into(),
            ));
        };
        self.set_admin_status(booking_id, admin_id, AdminStatus::NeedsAction, Some(notes))
            .await
    }

    async fn set_admin_status(
        &self,
        booking_id: &str,
        admin_id: &str,
        status: AdminStatus,
        notes: Option<String>,
    ) -> Result<Booking, BookingError> {
        let action = match status {
            AdminStatus::NeedsAction => AuditAction::AdminNeedsAction,
            _ => AuditAction::AdminVerified,
        };
        let booking_id = booking_id.to_string();
        let admin_id = admin_id.to_string();
        let now = self.now();

        let booking = self
            .write(move |tx| {
                let mut booking = load_booking(tx, &booking_id)?;
                let before = audit::admin_snapshot(&booking);

                booking.admin_status = status;
                booking.admin_verified_at = Some(now);
                booking.admin_verified_by = Some(admin_id.clone());
                booking.admin_notes = notes.clone();
                booking.updated_at = now;
                save(tx, &booking)?;

                audit::append(
                    tx,
                    &booking.id,
                    Entry {
                        action,
                        actor: Some(admin_id.as_str()),
                        before: Some(before),
                        after: Some(audit::admin_snapshot(&booking)),
                        notes: notes.as_deref(),
                    },
                    now,
                )?;
                Ok(booking)
            })
            .await?;

        info!(booking_id = %booking.id, admin_status = %status, "admin review recorded");
        Ok(booking)
    }

    /// Swap the slip for a new image and send it back through verification.
    ///
    /// A verification already in flight for the old slip is discarded when
    /// its result arrives.
    pub async fn admin_replace_slip(
        &self,
        booking_id: &str,
        new_image_url: &str,
        admin_id: &str,
        notes: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let image_url = require_url(new_image_url)?;
        let notes = clean_notes(notes);
        let booking_id = booking_id.to_string();
        let admin_id = admin_id.to_string();
        let max_attempts = self.policy.verification_max_attempts;
        let now = self.now();

        let booking = self
            .write(move |tx| {
                let mut booking = load_booking(tx, &booking_id)?;
                attach_slip(
                    tx,
                    &mut booking,
                    SlipUpload {
                        image_url: &image_url,
                        actor: &admin_id,
                        notes: notes.as_deref(),
                        replacing: true,
                        max_attempts,
                        at: now,
                    },
                )?;
                Ok(booking)
            })
            .await?;

        self.verification_ready.notify_one();
        info!(booking_id = %booking.id, "slip replaced by admin, verification queued");
        Ok(booking)
    }
}
