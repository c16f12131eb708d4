// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin overrides, discounts, availability, and the free-form audit entry.

use std::str::FromStr;

use innkeep_core::{
    AdminStatus, AuditAction, Booking, BookingError, PaymentType, SlipokStatus,
};
use innkeep_test_utils::{TestHarness, date};
use rust_decimal::Decimal;
use serde_json::json;

async fn booked(h: &TestHarness) -> Booking {
    h.engine
        .create_booking(h.deluxe_request("guest-1", date(2025, 6, 10), date(2025, 6, 12)))
        .await
        .unwrap()
}

// ---- Admin review ----

#[tokio::test]
async fn admin_verifies_and_flags_payment() {
    let h = TestHarness::new().await.unwrap();
    let booking = booked(&h).await;

    let verified = h
        .engine
        .admin_verify_slip(&booking.id, "admin-1", Some("cash at desk"))
        .await
        .unwrap();
    assert_eq!(verified.admin_status, AdminStatus::Verified);
    assert_eq!(verified.admin_verified_by.as_deref(), Some("admin-1"));
    assert!(verified.admin_verified_at.is_some());
    assert_eq!(verified.admin_notes.as_deref(), Some("cash at desk"));

    let flagged = h
        .engine
        .admin_mark_needs_action(&booking.id, "admin-2", "amount short by 200")
        .await
        .unwrap();
    assert_eq!(flagged.admin_status, AdminStatus::NeedsAction);

    let history = h.engine.get_audit_history(&booking.id).await.unwrap();
    let tail: Vec<_> = history.iter().skip(1).map(|r| r.action).collect();
    assert_eq!(
        tail,
        vec![AuditAction::AdminVerified, AuditAction::AdminNeedsAction]
    );
    assert_eq!(history[2].actor_id.as_deref(), Some("admin-2"));
    assert_eq!(history[2].before.as_ref().unwrap()["admin_status"], "verified");
    assert_eq!(history[2].after.as_ref().unwrap()["admin_status"], "needs_action");
}

#[tokio::test]
async fn flagging_requires_notes() {
    let h = TestHarness::new().await.unwrap();
    let booking = booked(&h).await;

    let err = h
        .engine
        .admin_mark_needs_action(&booking.id, "admin-1", "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
    assert_eq!(
        h.engine.get_booking(&booking.id).await.unwrap().admin_status,
        AdminStatus::Pending
    );
}

#[tokio::test]
async fn admin_replacement_is_recorded_as_replacement() {
    let h = TestHarness::new().await.unwrap();
    let booking = booked(&h).await;

    let replaced = h
        .engine
        .admin_replace_slip(&booking.id, "slips/desk-scan.jpg", "admin-1", Some("emailed"))
        .await
        .unwrap();
    assert_eq!(replaced.slipok_status, SlipokStatus::Pending);

    let history = h.engine.get_audit_history(&booking.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.action, AuditAction::SlipReplaced);
    assert_eq!(last.actor_id.as_deref(), Some("admin-1"));
    assert_eq!(last.notes.as_deref(), Some("emailed"));

    h.worker.drain().await.unwrap();
    assert_eq!(
        h.engine.get_booking(&booking.id).await.unwrap().slipok_status,
        SlipokStatus::Verified
    );
}

// ---- Discounts ----

#[tokio::test]
async fn later_discount_replaces_earlier_one() {
    let h = TestHarness::new().await.unwrap();
    let booking = booked(&h).await;

    let first = h
        .engine
        .apply_discount(&booking.id, Decimal::new(500, 0), "loyal guest", "admin-1")
        .await
        .unwrap();
    assert_eq!(first.total_price, Decimal::new(1500, 0));
    assert_eq!(first.payment_amount, Decimal::new(750, 0));

    let second = h
        .engine
        .apply_discount(&booking.id, Decimal::new(300, 0), "corrected", "admin-1")
        .await
        .unwrap();
    assert_eq!(second.original_total, Some(Decimal::new(2000, 0)));
    assert_eq!(second.discount_amount, Decimal::new(300, 0));
    assert_eq!(second.total_price, Decimal::new(1700, 0));
    assert_eq!(second.payment_amount, Decimal::new(850, 0));
    assert_eq!(second.discount_reason.as_deref(), Some("corrected"));
    // Points stay as earned.
    assert_eq!(second.points_earned, 20000);

    let history = h.engine.get_audit_history(&booking.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.action, AuditAction::DiscountApplied);
    let previous = last.before.as_ref().unwrap()["discount_amount"].as_str().unwrap();
    assert_eq!(Decimal::from_str(previous).unwrap(), Decimal::new(500, 0));
}

#[tokio::test]
async fn full_payment_discount_recomputes_payment_amount() {
    let h = TestHarness::new().await.unwrap();
    let mut request = h.deluxe_request("guest-1", date(2025, 6, 10), date(2025, 6, 12));
    request.payment_type = Some(PaymentType::Full);
    let booking = h.engine.create_booking(request).await.unwrap();

    let discounted = h
        .engine
        .apply_discount(&booking.id, Decimal::new(12550, 2), "late check-in", "admin-1")
        .await
        .unwrap();
    assert_eq!(discounted.total_price, Decimal::new(187450, 2));
    assert_eq!(discounted.payment_amount, Decimal::new(187450, 2));
}

#[tokio::test]
async fn discount_validation() {
    let h = TestHarness::new().await.unwrap();
    let booking = booked(&h).await;

    for (amount, reason) in [
        (Decimal::ZERO, "x"),
        (Decimal::new(-5, 0), "x"),
        (Decimal::new(1, 3), "rounds to nothing"),
        (Decimal::ONE, " "),
    ] {
        let err = h
            .engine
            .apply_discount(&booking.id, amount, reason, "admin-1")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)), "{amount} {reason:?}");
    }

    let too_big = h
        .engine
        .apply_discount(&booking.id, Decimal::new(2001, 0), "oops", "admin-1")
        .await
        .unwrap_err();
    assert!(matches!(too_big, BookingError::InvalidDiscount(_)));

    let unchanged = h.engine.get_booking(&booking.id).await.unwrap();
    assert_eq!(unchanged.total_price, Decimal::new(2000, 0));
    assert!(unchanged.original_total.is_none());
    let history = h.engine.get_audit_history(&booking.id).await.unwrap();
    assert!(history.iter().all(|r| r.action != AuditAction::DiscountApplied));

    h.engine.cancel_booking(&booking.id, "guest-1", None).await.unwrap();
    let cancelled = h
        .engine
        .apply_discount(&booking.id, Decimal::new(100, 0), "goodwill", "admin-1")
        .await
        .unwrap_err();
    assert!(matches!(cancelled, BookingError::Validation(_)));
}

// ---- Availability and audit ----

#[tokio::test]
async fn availability_reflects_bookings_and_blocks() {
    let h = TestHarness::builder().with_rooms(&["102", "103"]).build().await.unwrap();
    booked(&h).await;

    let free = h
        .engine
        .available_rooms(h.deluxe.id, date(2025, 6, 11), date(2025, 6, 13))
        .await
        .unwrap();
    let numbers: Vec<_> = free.iter().map(|r| r.room_number.as_str()).collect();
    assert_eq!(numbers, vec!["102", "103"]);

    let summary = h
        .engine
        .availability_summary(date(2025, 6, 10), date(2025, 6, 12))
        .await
        .unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].total_rooms, 3);
    assert_eq!(summary[0].available_rooms, 2);

    let missing = h
        .engine
        .available_rooms(999, date(2025, 6, 10), date(2025, 6, 12))
        .await
        .unwrap_err();
    assert!(matches!(missing, BookingError::NotFound { .. }));
}

#[tokio::test]
async fn log_action_appends_and_history_is_ordered() {
    let h = TestHarness::new().await.unwrap();
    let booking = booked(&h).await;

    let id = h
        .engine
        .log_action(
            &booking.id,
            AuditAction::AdminNeedsAction,
            Some("system"),
            None,
            Some(json!({ "flag": "chargeback" })),
            Some("bank dispute"),
        )
        .await
        .unwrap();

    let with_audit = h.engine.get_booking_with_audit(&booking.id).await.unwrap();
    assert_eq!(with_audit.booking.id, booking.id);
    assert_eq!(with_audit.audit.len(), 2);
    assert_eq!(with_audit.audit[1].id, id);
    assert!(with_audit.audit[0].id < with_audit.audit[1].id);

    let err = h
        .engine
        .log_action("missing", AuditAction::AdminVerified, None, None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound { .. }));
}

#[tokio::test]
async fn sub_cent_discount_cannot_erase_an_existing_one() {
    let h = TestHarness::new().await.unwrap();
    let booking = booked(&h).await;
    h.engine
        .apply_discount(&booking.id, Decimal::new(500, 0), "loyal guest", "admin-1")
        .await
        .unwrap();

    let err = h
        .engine
        .apply_discount(&booking.id, Decimal::new(4, 3), "wipe", "admin-2")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let kept = h.engine.get_booking(&booking.id).await.unwrap();
    assert_eq!(kept.discount_amount, Decimal::new(500, 0));
    assert_eq!(kept.total_price, Decimal::new(1500, 0));
    assert_eq!(kept.discount_reason.as_deref(), Some("loyal guest"));
}
