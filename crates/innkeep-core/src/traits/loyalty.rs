// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loyalty ledger trait.
//!
//! The reservation engine calls the ledger after a booking transaction
//! commits. Failures are logged by the caller and never roll back booking state.

use async_trait::async_trait;

use crate::error::InnkeepError;
use crate::traits::adapter::PluginAdapter;

/// Awards and deducts loyalty points for a user.
#[async_trait]
pub trait LoyaltyLedger: PluginAdapter {
    /// Credit `points` to `user_id`. `reference_id` identifies the source
    /// (e.g. `BOOKING-<id>`) so repeated awards can be detected.
    async fn award(
        &self,
        user_id: &str,
        points: i64,
        description: &str,
        reference_id: &str,
    ) -> Result<(), InnkeepError>;

    /// Debit `points` from `user_id`.
    async fn deduct(&self, user_id: &str, points: i64, description: &str)
        -> Result<(), InnkeepError>;
}
