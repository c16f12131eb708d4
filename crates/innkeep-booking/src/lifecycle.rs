// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking creation, cancellation, completion, and reads.

use innkeep_core::money;
use innkeep_core::{
    AdminStatus, AuditAction, Booking, BookingError, BookingFilter, BookingStatus,
    BookingUpdate, BookingWithAudit, NewBooking, Page, SlipokStatus,
};
use innkeep_storage::queries::{audit as audit_queries, bookings, catalog};
use innkeep_storage::{is_overlap_violation, sql_err};
use rusqlite::Connection;
use tracing::{error, info};

use crate::audit::{self, Entry};
use crate::availability::validate_range;
use crate::discount::discounted_total;
use crate::engine::BookingEngine;

/// Largest page the admin list will return.
const MAX_PER_PAGE: u32 = 100;

/// Load a booking or fail with `NotFound`.
pub(crate) fn load_booking(conn: &Connection, booking_id: &str) -> Result<Booking, BookingError> {
    bookings::booking_by_id(conn, booking_id)
        .map_err(sql_err)?
        .ok_or_else(|| BookingError::not_found("booking", booking_id))
}

/// Persist `booking`, mapping a lost row to `NotFound`.
pub(crate) fn save(conn: &Connection, booking: &Booking) -> Result<(), BookingError> {
    if bookings::save_booking(conn, booking).map_err(stay_conflict)? {
        Ok(())
    } else {
        Err(BookingError::not_found("booking", booking.id.clone()))
    }
}

/// The overlap trigger fired: another confirmed stay holds the room.
fn stay_conflict(e: rusqlite::Error) -> BookingError {
    if is_overlap_violation(&e) {
        BookingError::NoAvailability
    } else {
        sql_err(e).into()
    }
}

impl BookingEngine {
    /// Reserve the first free room of the requested category.
    ///
    /// Loyalty points are awarded after commit; a ledger failure is logged
    /// and does not undo the booking.
    pub async fn create_booking(&self, request: NewBooking) -> Result<Booking, BookingError> {
        validate_range(request.check_in, request.check_out)?;
        let today = self.today();
        if request.check_in < today {
            return Err(BookingError::Validation(format!(
                "check-in {} is in the past (today is {today})",
                request.check_in
            )));
        }
        if request.guest_count == 0 {
            return Err(BookingError::Validation(
                "guest count must be at least 1".into(),
            ));
        }

        let now = self.now();
        let policy = self.policy.clone();
        let booking = self
            .write(move |tx| {
                let category = catalog::category_by_id(tx, request.category_id)
                    .map_err(sql_err)?
                    .filter(|c| c.active)
                    .ok_or_else(|| {
                        BookingError::not_found("room category", request.category_id.to_string())
                    })?;
                if request.guest_count > category.max_occupancy {
                    return Err(BookingError::CapacityExceeded {
                        requested: request.guest_count,
                        max: category.max_occupancy,
                    });
                }

                let room = catalog::available_rooms_in(
                    tx,
                    category.id,
                    request.check_in,
                    request.check_out,
                )
                .map_err(sql_err)?
                .into_iter()
                .next()
                .ok_or(BookingError::NoAvailability)?;

                let nights = (request.check_out - request.check_in).num_days();
                let total_price = money::stay_total(category.nightly_price, nights);
                let payment_type = request
                    .payment_type
                    .unwrap_or(policy.default_payment_type);

                let booking = Booking {
                    id: uuid::Uuid::new_v4().to_string(),
                    user_id: request.user_id,
                    room_id: room.id,
                    room_number: room.room_number,
                    category_id: category.id,
                    check_in: request.check_in,
                    check_out: request.check_out,
                    guest_count: request.guest_count,
                    notes: request.notes,
                    total_price,
                    points_earned: money::points_for(total_price, policy.points_per_currency_unit),
                    discount_amount: rust_decimal::Decimal::ZERO,
                    discount_reason: None,
                    original_total: None,
                    payment_type,
                    payment_amount: money::payment_amount(
                        total_price,
                        payment_type,
                        policy.deposit_ratio,
                    ),
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
                    created_at: now,
                    updated_at: now,
                };

                bookings::insert_booking(tx, &booking).map_err(stay_conflict)?;
                audit::append(
                    tx,
                    &booking.id,
                    Entry {
                        action: AuditAction::BookingCreated,
                        actor: Some(booking.user_id.as_str()),
                        before: None,
                        after: Some(audit::full_snapshot(&booking)?),
                        notes: None,
                    },
                    now,
                )?;
                Ok(booking)
            })
            .await?;

        info!(
            booking_id = %booking.id,
            user_id = %booking.user_id,
            room = %booking.room_number,
            check_in = %booking.check_in,
            check_out = %booking.check_out,
            total = %booking.total_price,
            "booking created"
        );

        if booking.points_earned > 0 {
            let description = format!(
                "Booking room {} ({} to {})",
                booking.room_number, booking.check_in, booking.check_out
            );
            let reference = format!("BOOKING-{}", booking.id);
            if let Err(e) = self
                .ledger
                .award(&booking.user_id, booking.points_earned, &description, &reference)
                .await
            {
                error!(
                    booking_id = %booking.id,
                    points = booking.points_earned,
                    error = %e,
                    "failed to award loyalty points"
                );
            }
        }

        Ok(booking)
    }

    /// Change the dates, party size, or notes of a confirmed booking.
    ///
    /// The room is kept. Moving the dates reprices the stay from the nightly
    /// rate; an applied discount stays in place against the new base. The
    /// loyalty difference is settled after commit.
    pub async fn update_booking(
        &self,
        booking_id: &str,
        changes: BookingUpdate,
        requesting_user_id: &str,
    ) -> Result<Booking, BookingError> {
        if changes.is_empty() {
            return Err(BookingError::Validation("no changes requested".into()));
        }
        if changes.guest_count == Some(0) {
            return Err(BookingError::Validation(
                "guest count must be at least 1".into(),
            ));
        }

        let booking_id = booking_id.to_string();
        let user_id = requesting_user_id.to_string();
        let policy = self.policy.clone();
        let today = self.today();
        let now = self.now();

        let (booking, points_before) = self
            .write(move |tx| {
                let mut booking = load_booking(tx, &booking_id)?;
                if booking.user_id != user_id {
                    return Err(BookingError::Forbidden(
                        "only the booking owner can change it".into(),
                    ));
                }
                match booking.status {
                    BookingStatus::Cancelled => return Err(BookingError::AlreadyCancelled),
                    BookingStatus::Completed => {
                        return Err(BookingError::Validation(
                            "a completed booking cannot be changed".into(),
                        ));
                    }
                    BookingStatus::Confirmed => {}
                }

                let check_in = changes.check_in.unwrap_or(booking.check_in);
                let check_out = changes.check_out.unwrap_or(booking.check_out);
                validate_range(check_in, check_out)?;
                if check_in != booking.check_in && check_in < today {
                    return Err(BookingError::Validation(format!(
                        "check-in {check_in} is in the past (today is {today})"
                    )));
                }

                // Inactive categories still honour their existing bookings.
                let category = catalog::category_by_id(tx, booking.category_id)
                    .map_err(sql_err)?
                    .ok_or_else(|| {
                        BookingError::not_found("room category", booking.category_id.to_string())
                    })?;
                let guest_count = changes.guest_count.unwrap_or(booking.guest_count);
                if guest_count > category.max_occupancy {
                    return Err(BookingError::CapacityExceeded {
                        requested: guest_count,
                        max: category.max_occupancy,
                    });
                }

                let dates_moved = check_in != booking.check_in || check_out != booking.check_out;
                if dates_moved
                    && catalog::room_blocked_in(tx, booking.room_id, check_in, check_out)
                        .map_err(sql_err)?
                {
                    return Err(BookingError::NoAvailability);
                }

                let before = audit::stay_snapshot(&booking);
                let points_before = booking.points_earned;

                booking.check_in = check_in;
                booking.check_out = check_out;
                booking.guest_count = guest_count;
                if let Some(notes) = changes.notes {
                    let notes = notes.trim();
                    booking.notes = (!notes.is_empty()).then(|| notes.to_string());
                }

                if dates_moved {
                    let base = money::stay_total(category.nightly_price, booking.nights());
                    let total = if booking.original_total.is_some() {
                        booking.original_total = Some(base);
                        discounted_total(base, booking.discount_amount).ok_or_else(|| {
                            BookingError::InvalidDiscount(format!(
                                "discount {} exceeds the new total {base}",
                                booking.discount_amount
                            ))
                        })?
                    } else {
                        base
                    };
                    booking.total_price = total;
                    booking.payment_amount =
                        money::payment_amount(total, booking.payment_type, policy.deposit_ratio);
                    booking.points_earned =
                        money::points_for(base, policy.points_per_currency_unit);
                }
                booking.updated_at = now;
                save(tx, &booking)?;

                audit::append(
                    tx,
                    &booking.id,
                    Entry {
                        action: AuditAction::BookingUpdated,
                        actor: Some(user_id.as_str()),
                        before: Some(before),
                        after: Some(audit::stay_snapshot(&booking)),
                        notes: None,
                    },
                    now,
                )?;
                Ok((booking, points_before))
            })
            .await?;

        info!(
            booking_id = %booking.id,
            check_in = %booking.check_in,
            check_out = %booking.check_out,
            guests = booking.guest_count,
            total = %booking.total_price,
            "booking updated"
        );

        let delta = booking.points_earned - points_before;
        let settled = if delta > 0 {
            let description = format!(
                "Changed booking room {} ({} to {})",
                booking.room_number, booking.check_in, booking.check_out
            );
            let reference = format!("BOOKING-{}-UPDATE-{}", booking.id, now.timestamp_millis());
            self.ledger
                .award(&booking.user_id, delta, &description, &reference)
                .await
        } else if delta < 0 {
            let description = format!("Shortened booking room {}", booking.room_number);
            self.ledger
                .deduct(&booking.user_id, -delta, &description)
                .await
        } else {
            Ok(())
        };
        if let Err(e) = settled {
            error!(
                booking_id = %booking.id,
                points = delta,
                error = %e,
                "failed to settle loyalty points for booking change"
            );
        }

        Ok(booking)
    }

    /// Guest-initiated cancellation. Only the owner may cancel, and only
    /// before the check-in date.
    pub async fn cancel_booking(
        &self,
        booking_id: &str,
        requesting_user_id: &str,
        reason: Option<&str>,
    ) -> Result<Booking, BookingError> {
        self.cancel(booking_id, requesting_user_id, reason, false).await
    }

    /// Staff cancellation on behalf of the guest. Skips the ownership check.
    pub async fn admin_cancel_booking(
        &self,
        booking_id: &str,
        admin_id: &str,
        reason: Option<&str>,
    ) -> Result<Booking, BookingError> {
        self.cancel(booking_id, admin_id, reason, true).await
    }

    async fn cancel(
        &self,
        booking_id: &str,
        actor_id: &str,
        reason: Option<&str>,
        by_admin: bool,
    ) -> Result<Booking, BookingError> {
        let booking_id = booking_id.to_string();
        let actor_id = actor_id.to_string();
        let reason = reason.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string);
        let today = self.today();
        let now = self.now();

        let booking = self
            .write(move |tx| {
                let mut booking = load_booking(tx, &booking_id)?;
                if !by_admin && booking.user_id != actor_id {
                    return Err(BookingError::Forbidden(
                        "only the booking owner can cancel it".into(),
                    ));
                }
                match booking.status {
                    BookingStatus::Cancelled => return Err(BookingError::AlreadyCancelled),
                    BookingStatus::Completed => {
                        return Err(BookingError::Validation(
                            "a completed booking cannot be cancelled".into(),
                        ));
                    }
                    BookingStatus::Confirmed => {}
                }
                if booking.check_in <= today {
                    return Err(BookingError::PastCheckIn);
                }

                let before = audit::status_snapshot(&booking);
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(now);
                booking.cancellation_reason = reason.clone();
                booking.cancelled_by = Some(actor_id.clone());
                booking.cancelled_by_admin = by_admin;
                booking.updated_at = now;
                save(tx, &booking)?;

                audit::append(
                    tx,
                    &booking.id,
                    Entry {
                        action: AuditAction::BookingCancelled,
                        actor: Some(actor_id.as_str()),
                        before: Some(before),
                        after: Some(audit::status_snapshot(&booking)),
                        notes: reason.as_deref(),
                    },
                    now,
                )?;
                Ok(booking)
            })
            .await?;

        info!(
            booking_id = %booking.id,
            by_admin,
            "booking cancelled"
        );

        if booking.points_earned > 0 {
            let description = format!("Cancelled booking room {}", booking.room_number);
            if let Err(e) = self
                .ledger
                .deduct(&booking.user_id, booking.points_earned, &description)
                .await
            {
                error!(
                    booking_id = %booking.id,
                    points = booking.points_earned,
                    error = %e,
                    "failed to deduct loyalty points"
                );
            }
        }

        Ok(booking)
    }

    /// Mark a stay as completed once its check-out date has arrived.
    pub async fn complete_booking(
        &self,
        booking_id: &str,
        actor_id: &str,
    ) -> Result<Booking, BookingError> {
        let booking_id = booking_id.to_string();
        let actor_id = actor_id.to_string();
        let today = self.today();
        let now = self.now();

        let booking = self
            .write(move |tx| {
                let mut booking = load_booking(tx, &booking_id)?;
                if booking.status != BookingStatus::Confirmed {
                    return Err(BookingError::Validation(format!(
                        "only confirmed bookings can be completed (status is {})",
                        booking.status
                    )));
                }
                if booking.check_out > today {
                    return Err(BookingError::Validation(format!(
                        "stay ends on {}; it cannot be completed before then",
                        booking.check_out
                    )));
                }

                let before = audit::status_snapshot(&booking);
                booking.status = BookingStatus::Completed;
                booking.updated_at = now;
                save(tx, &booking)?;
                audit::append(
                    tx,
                    &booking.id,
                    Entry {
                        action: AuditAction::BookingCompleted,
                        actor: Some(actor_id.as_str()),
                        before: Some(before),
                        after: Some(audit::status_snapshot(&booking)),
                        notes: None,
                    },
                    now,
                )?;
                Ok(booking)
            })
            .await?;

        info!(booking_id = %booking.id, "booking completed");
        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: &str) -> Result<Booking, BookingError> {
        let booking_id = booking_id.to_string();
        self.read(move |conn| load_booking(conn, &booking_id)).await
    }

    /// A booking and its audit trail, read in one pass.
    pub async fn get_booking_with_audit(
        &self,
        booking_id: &str,
    ) -> Result<BookingWithAudit, BookingError> {
        let booking_id = booking_id.to_string();
        self.read(move |conn| {
            let booking = load_booking(conn, &booking_id)?;
            let audit = audit_queries::history(conn, &booking_id).map_err(sql_err)?;
            Ok(BookingWithAudit { booking, audit })
        })
        .await
    }

    /// Filtered, sorted, paginated booking list for back-office views.
    pub async fn list_bookings_for_admin(
        &self,
        filter: BookingFilter,
    ) -> Result<Page<Booking>, BookingError> {
        if let (Some(from), Some(to)) = (filter.check_in_from, filter.check_in_to)
            && from > to
        {
            return Err(BookingError::Validation(format!(
                "check-in range start {from} is after its end {to}"
            )));
        }
        let filter = BookingFilter {
            page: filter.page.max(1),
            per_page: filter.per_page.clamp(1, MAX_PER_PAGE),
            ..filter
        };
        let (page, per_page) = (filter.page, filter.per_page);

        let (items, total) = self
            .read(move |conn| bookings::list_bookings_in(conn, &filter).map_err(|e| sql_err(e).into()))
            .await?;
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }
}
