// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits for the external collaborators of the reservation engine.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod loyalty;
pub mod verifier;

pub use adapter::PluginAdapter;
pub use loyalty::LoyaltyLedger;
pub use verifier::{QuotaStatus, SlipVerifier, VerificationOutcome};
