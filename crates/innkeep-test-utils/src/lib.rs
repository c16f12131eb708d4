// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Innkeep integration tests.
//!
//! Provides mock collaborators and a seeded engine harness for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`MockLoyaltyLedger`] - records awards and deductions, can be told to fail
//! - [`MockSlipVerifier`] - scripted verification outcomes and quota state
//! - [`FixedClock`] - settable time source
//! - [`TestHarness`] - temp database with one seeded category and room

pub mod clock;
pub mod harness;
pub mod mock_ledger;
pub mod mock_verifier;

pub use clock::FixedClock;
pub use harness::{TestHarness, date};
pub use mock_ledger::{LedgerCall, MockLoyaltyLedger};
pub use mock_verifier::MockSlipVerifier;
