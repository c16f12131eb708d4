// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Innkeep reservation engine.
//!
//! [`InnkeepError`] covers infrastructure failures (storage, configuration,
//! external providers). [`BookingError`] is the tagged domain taxonomy that
//! every caller-facing booking operation returns.

use strum::{Display, EnumString};
use thiserror::Error;

/// Infrastructure error type shared by storage, config, and adapter code.
#[derive(Debug, Error)]
pub enum InnkeepError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, row mapping).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// External provider errors (HTTP failure, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl InnkeepError {
    /// Wrap any error as a storage failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(err),
        }
    }
}

/// Domain errors returned by booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Booking, room, or category does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Ownership or role violation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Guest count above the category's maximum occupancy.
    #[error("guest count {requested} exceeds maximum occupancy of {max}")]
    CapacityExceeded { requested: u32, max: u32 },

    /// No room in the category is free for the requested dates.
    #[error("no rooms available for the selected dates")]
    NoAvailability,

    #[error("booking is already cancelled")]
    AlreadyCancelled,

    /// Check-in date is today or earlier.
    #[error("check-in date has already passed")]
    PastCheckIn,

    /// Missing mandatory notes/reason, non-positive amounts, bad date ranges.
    #[error("validation error: {0}")]
    Validation(String),

    /// Discount would drive the booking total below zero.
    #[error("invalid discount: {0}")]
    InvalidDiscount(String),

    /// Slip verification call failed. Mapped to the `failed` slip status
    /// by the verification worker and never returned from `upload_slip`.
    #[error("verification provider error: {0}")]
    Provider(String),

    /// Storage or other infrastructure failure.
    #[error(transparent)]
    Infrastructure(#[from] InnkeepError),
}

/// Flat discriminant of [`BookingError`], for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    CapacityExceeded,
    NoAvailability,
    AlreadyCancelled,
    PastCheckIn,
    Validation,
    InvalidDiscount,
    Provider,
    Infrastructure,
}

impl BookingError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the error kind without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::NoAvailability => ErrorKind::NoAvailability,
            Self::AlreadyCancelled => ErrorKind::AlreadyCancelled,
            Self::PastCheckIn => ErrorKind::PastCheckIn,
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidDiscount(_) => ErrorKind::InvalidDiscount,
            Self::Provider(_) => ErrorKind::Provider,
            Self::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }
}
