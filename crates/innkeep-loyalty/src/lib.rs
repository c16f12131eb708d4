// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loyalty points ledger.
//!
//! [`PointsLedger`] implements [`innkeep_core::LoyaltyLedger`] on top of the
//! engine's SQLite database. The reservation engine treats it as an external
//! collaborator and only calls it after a booking transaction commits.

pub mod ledger;

pub use ledger::{PointsLedger, PointsTransaction, TransactionKind};
