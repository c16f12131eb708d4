// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Innkeep reservation engine.
//!
//! This crate provides the domain types, error taxonomy, money arithmetic,
//! and the adapter traits for the engine's external collaborators (loyalty
//! ledger and slip verification provider).

pub mod clock;
pub mod error;
pub mod money;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use error::{BookingError, ErrorKind, InnkeepError};
pub use types::{
    AdapterType, AdminStatus, AuditAction, AuditRecord, BlockedDate, Booking, BookingFilter,
    BookingStatus, BookingUpdate, BookingWithAudit, CategoryAvailability, HealthStatus,
    NewBooking, Page, PaymentType, Room, RoomCategory, SlipokStatus, SortField, SortOrder,
};

pub use traits::{LoyaltyLedger, PluginAdapter, QuotaStatus, SlipVerifier, VerificationOutcome};
