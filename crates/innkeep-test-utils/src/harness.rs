// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end booking tests.
//!
//! `TestHarness` opens a migrated SQLite database in a temp directory, seeds
//! a "Deluxe" category (1000 per night, up to 2 guests) with room 101, and
//! wires a `BookingEngine` and `VerificationWorker` to mock collaborators.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use innkeep_booking::{BookingEngine, BookingPolicy, VerificationWorker};
use innkeep_config::model::WorkerConfig;
use innkeep_core::{InnkeepError, NewBooking, Room, RoomCategory};
use innkeep_storage::Database;
use innkeep_storage::queries::catalog;
use rust_decimal::Decimal;

use crate::clock::FixedClock;
use crate::mock_ledger::MockLoyaltyLedger;
use crate::mock_verifier::MockSlipVerifier;

/// Calendar date shorthand for tests. Panics on an invalid date.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| {
        panic!("invalid test date {year}-{month}-{day}")
    })
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    now: DateTime<Utc>,
    policy: BookingPolicy,
    extra_rooms: Vec<String>,
    failing_ledger: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            // 10:00 on 2025-06-01 in the default +07:00 hotel timezone.
            now: Utc
                .with_ymd_and_hms(2025, 6, 1, 3, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            policy: BookingPolicy::default(),
            extra_rooms: Vec::new(),
            failing_ledger: false,
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_policy(mut self, policy: BookingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add more Deluxe rooms besides 101.
    pub fn with_rooms(mut self, numbers: &[&str]) -> Self {
        self.extra_rooms = numbers.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Use a loyalty ledger that fails every call.
    pub fn with_failing_ledger(mut self) -> Self {
        self.failing_ledger = true;
        self
    }

    pub async fn build(self) -> Result<TestHarness, InnkeepError> {
        let temp_dir = tempfile::TempDir::new().map_err(InnkeepError::storage)?;
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        let deluxe = catalog::insert_category(
            &db,
            "Deluxe",
            Some("King bed, garden view"),
            Decimal::new(1000, 0),
            2,
        )
        .await?;
        let room_101 = catalog::insert_room(&db, deluxe.id, "101").await?;
        for number in &self.extra_rooms {
            catalog::insert_room(&db, deluxe.id, number).await?;
        }

        let ledger = Arc::new(if self.failing_ledger {
            MockLoyaltyLedger::failing()
        } else {
            MockLoyaltyLedger::new()
        });
        let verifier = Arc::new(MockSlipVerifier::new());
        let clock = Arc::new(FixedClock::new(self.now));

        let engine = BookingEngine::new(db.clone(), ledger.clone(), clock.clone(), self.policy);
        let worker = VerificationWorker::new(
            engine.clone(),
            verifier.clone(),
            &WorkerConfig {
                poll_interval_ms: 20,
                ..WorkerConfig::default()
            },
        );

        Ok(TestHarness {
            db,
            engine,
            worker,
            ledger,
            verifier,
            clock,
            deluxe,
            room_101,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock collaborators and temp storage.
pub struct TestHarness {
    pub db: Database,
    pub engine: BookingEngine,
    pub worker: VerificationWorker,
    pub ledger: Arc<MockLoyaltyLedger>,
    pub verifier: Arc<MockSlipVerifier>,
    pub clock: Arc<FixedClock>,
    /// The seeded category.
    pub deluxe: RoomCategory,
    pub room_101: Room,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with all defaults.
    pub async fn new() -> Result<Self, InnkeepError> {
        Self::builder().build().await
    }

    /// A Deluxe booking request for two guests.
    pub fn deluxe_request(&self, user_id: &str, check_in: NaiveDate, check_out: NaiveDate) -> NewBooking {
        NewBooking {
            user_id: user_id.to_string(),
            category_id: self.deluxe.id,
            check_in,
            check_out,
            guest_count: 2,
            notes: None,
            payment_type: None,
        }
    }
}
