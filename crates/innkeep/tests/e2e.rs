// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the production adapters.
//!
//! Each test opens its own temp SQLite database and wires the booking engine
//! to the SQLite points ledger and the SlipOK verifier, with SlipOK served
//! by a wiremock server.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use innkeep_booking::{BookingEngine, BookingPolicy, JobReport, VerificationWorker};
use innkeep_config::model::{SlipokConfig, WorkerConfig};
use innkeep_core::{AuditAction, Booking, NewBooking, SlipokStatus};
use innkeep_loyalty::PointsLedger;
use innkeep_slipok::SlipokVerifier;
use innkeep_slipok::client::NOT_CONFIGURED;
use innkeep_storage::Database;
use innkeep_storage::queries::catalog;
use innkeep_test_utils::{FixedClock, date};
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Stack {
    engine: BookingEngine,
    worker: VerificationWorker,
    ledger: PointsLedger,
    category_id: i64,
    _dir: tempfile::TempDir,
}

async fn stack(slipok: SlipokConfig) -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("innkeep.db").to_string_lossy())
        .await
        .unwrap();
    let category = catalog::insert_category(&db, "Deluxe", None, Decimal::new(1000, 0), 2)
        .await
        .unwrap();
    for number in ["101", "102"] {
        catalog::insert_room(&db, category.id, number).await.unwrap();
    }

    let ledger = PointsLedger::new(db.clone());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 3, 0, 0).unwrap(),
    ));
    let engine = BookingEngine::new(
        db.clone(),
        Arc::new(ledger.clone()),
        clock,
        BookingPolicy::default(),
    );
    let verifier = SlipokVerifier::new(&slipok, db.clone()).await.unwrap();
    let worker = VerificationWorker::new(engine.clone(), Arc::new(verifier), &WorkerConfig::default());

    Stack {
        engine,
        worker,
        ledger,
        category_id: category.id,
        _dir: dir,
    }
}

fn slipok_config(server: &MockServer, monthly_quota: Option<u64>) -> SlipokConfig {
    SlipokConfig {
        api_key: Some("test-key".into()),
        branch_id: Some("42".into()),
        api_url: server.uri(),
        public_base_url: Some("https://hotel.example.com".into()),
        timeout_secs: 5,
        monthly_quota,
    }
}

fn success_body() -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "success": true,
            "transRef": "0123456789ABCDEF",
            "transDate": "20250601",
            "transTime": "09:15:00",
            "amount": 1000,
            "sendingBank": "004",
            "receivingBank": "014",
            "sender": { "displayName": "MR. GUEST", "name": "Guest One" },
            "receiver": { "displayName": "INNKEEP HOTEL", "name": "Innkeep Hotel" }
        }
    })
}

async fn book(stack: &Stack, user: &str) -> Booking {
    stack
        .engine
        .create_booking(NewBooking {
            user_id: user.to_string(),
            category_id: stack.category_id,
            check_in: date(2025, 6, 10),
            check_out: date(2025, 6, 12),
            guest_count: 2,
            notes: Some("late arrival".into()),
            payment_type: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn stay_is_booked_paid_verified_and_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/42"))
        .and(header("x-authorization", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;
    let stack = stack(slipok_config(&server, None)).await;

    let booking = book(&stack, "guest-1").await;
    assert_eq!(booking.payment_amount, Decimal::new(1000, 0));
    assert_eq!(stack.ledger.balance("guest-1").await.unwrap(), 20000);

    stack
        .engine
        .upload_slip(&booking.id, "/uploads/slip-1.jpg", "guest-1")
        .await
        .unwrap();
    let reports = stack.worker.drain().await.unwrap();
    assert_eq!(reports.len(), 1);

    let paid = stack.engine.get_booking(&booking.id).await.unwrap();
    assert_eq!(paid.slipok_status, SlipokStatus::Verified);
    assert_eq!(
        paid.slipok_response.as_ref().unwrap()["data"]["transRef"],
        "0123456789ABCDEF"
    );

    stack
        .engine
        .cancel_booking(&booking.id, "guest-1", Some("flight cancelled"))
        .await
        .unwrap();
    assert_eq!(stack.ledger.balance("guest-1").await.unwrap(), 0);

    let actions: Vec<_> = stack
        .engine
        .get_audit_history(&booking.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::BookingCreated,
            AuditAction::SlipUploaded,
            AuditAction::SlipokVerified,
            AuditAction::BookingCancelled,
        ]
    );
}

#[tokio::test]
async fn monthly_cap_stops_provider_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;
    let stack = stack(slipok_config(&server, Some(1))).await;

    let first = book(&stack, "guest-1").await;
    let second = book(&stack, "guest-2").await;
    stack
        .engine
        .upload_slip(&first.id, "https://cdn.example.com/a.jpg", "guest-1")
        .await
        .unwrap();
    stack
        .engine
        .upload_slip(&second.id, "https://cdn.example.com/b.jpg", "guest-2")
        .await
        .unwrap();

    let reports = stack.worker.drain().await.unwrap();
    assert!(matches!(
        reports.as_slice(),
        [
            JobReport::Completed { status: SlipokStatus::Verified, .. },
            JobReport::Completed { status: SlipokStatus::QuotaExceeded, .. },
        ]
    ));
    assert_eq!(
        stack.engine.get_booking(&second.id).await.unwrap().slipok_status,
        SlipokStatus::QuotaExceeded
    );
}

#[tokio::test]
async fn unconfigured_provider_fails_slips_without_calling_out() {
    let stack = stack(SlipokConfig::default()).await;
    let booking = book(&stack, "guest-1").await;
    stack
        .engine
        .upload_slip(&booking.id, "https://cdn.example.com/a.jpg", "guest-1")
        .await
        .unwrap();

    stack.worker.drain().await.unwrap();

    let record = stack.engine.get_booking_with_audit(&booking.id).await.unwrap();
    assert_eq!(record.booking.slipok_status, SlipokStatus::Failed);
    let last = record.audit.last().unwrap();
    assert_eq!(last.action, AuditAction::SlipokFailed);
    assert!(last.notes.as_deref().unwrap().starts_with(NOT_CONFIGURED));
}
