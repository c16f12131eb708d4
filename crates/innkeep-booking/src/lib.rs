// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reservation engine: availability, booking lifecycle, payment
//! verification, discounts, and admin overrides.
//!
//! Every mutation runs as one immediate SQLite transaction on the storage
//! writer thread and appends exactly one audit record. Calls to the loyalty
//! ledger and the slip verification provider happen after commit and are
//! best-effort.

pub mod admin;
pub mod audit;
pub mod availability;
pub mod discount;
pub mod engine;
pub mod lifecycle;
pub mod payment;
pub mod policy;
pub mod worker;

pub use engine::BookingEngine;
pub use payment::{ApplyOutcome, VERIFICATION_QUEUE, VerificationJob};
pub use policy::BookingPolicy;
pub use worker::{JobReport, VerificationWorker};
