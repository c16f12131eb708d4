// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Innkeep workspace.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of external collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    LoyaltyLedger,
    SlipVerifier,
}

/// Lifecycle status of a booking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

/// How much of the total the guest pays up front.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Deposit,
    Full,
}

/// Automatic slip verification state.
///
/// `Pending` moves to one of the three terminal states; only a new slip
/// upload resets it to `Pending`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SlipokStatus {
    Pending,
    Verified,
    Failed,
    QuotaExceeded,
}

impl SlipokStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Manual admin review state. Admins may toggle between `Verified` and `NeedsAction`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdminStatus {
    Pending,
    Verified,
    NeedsAction,
}

/// Kind of transition recorded in the booking audit log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    BookingCreated,
    BookingUpdated,
    BookingCancelled,
    BookingCompleted,
    SlipUploaded,
    SlipReplaced,
    SlipokVerified,
    SlipokFailed,
    SlipokQuotaExceeded,
    AdminVerified,
    AdminNeedsAction,
    DiscountApplied,
}

impl AuditAction {
    /// Audit action recorded when automatic verification lands on `status`.
    pub fn for_slipok_status(status: SlipokStatus) -> Option<Self> {
        match status {
            SlipokStatus::Pending => None,
            SlipokStatus::Verified => Some(Self::SlipokVerified),
            SlipokStatus::Failed => Some(Self::SlipokFailed),
            SlipokStatus::QuotaExceeded => Some(Self::SlipokQuotaExceeded),
        }
    }
}

/// A room type with a nightly price and occupancy limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub nightly_price: Decimal,
    pub max_occupancy: u32,
    pub active: bool,
}

/// A physical room belonging to exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub category_id: i64,
    pub room_number: String,
    pub active: bool,
}

/// Admin-imposed unavailability of a room on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedDate {
    pub room_id: i64,
    pub date: NaiveDate,
    pub reason: Option<String>,
}

/// Category-level availability summary for browsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAvailability {
    pub category: RoomCategory,
    pub total_rooms: u32,
    pub available_rooms: u32,
}

/// The central reservation aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub room_id: i64,
    pub room_number: String,
    pub category_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub notes: Option<String>,

    pub total_price: Decimal,
    pub points_earned: i64,
    pub discount_amount: Decimal,
    pub discount_reason: Option<String>,
    pub original_total: Option<Decimal>,
    pub payment_type: PaymentType,
    pub payment_amount: Decimal,

    pub status: BookingStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancelled_by_admin: bool,

    pub slip_image_url: Option<String>,
    pub slip_uploaded_at: Option<DateTime<Utc>>,
    pub slipok_status: SlipokStatus,
    pub slipok_verified_at: Option<DateTime<Utc>>,
    pub slipok_response: Option<serde_json::Value>,

    pub admin_status: AdminStatus,
    pub admin_verified_at: Option<DateTime<Utc>>,
    pub admin_verified_by: Option<String>,
    pub admin_notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Number of nights in the stay.
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Pre-discount total: the captured baseline if any discount was applied.
    pub fn base_total(&self) -> Decimal {
        self.original_total.unwrap_or(self.total_price)
    }
}

/// One immutable entry of the booking audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub booking_id: String,
    pub action: AuditAction,
    /// `None` for system-triggered transitions such as automatic verification.
    pub actor_id: Option<String>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A booking together with its full audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingWithAudit {
    pub booking: Booking,
    pub audit: Vec<AuditRecord>,
}

/// Reservation request accepted by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    pub user_id: String,
    pub category_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub notes: Option<String>,
    /// Falls back to the configured default when absent.
    pub payment_type: Option<PaymentType>,
}

/// Changes to an existing booking. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingUpdate {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guest_count: Option<u32>,
    /// A blank string clears the notes.
    pub notes: Option<String>,
}

impl BookingUpdate {
    pub fn is_empty(&self) -> bool {
        self.check_in.is_none()
            && self.check_out.is_none()
            && self.guest_count.is_none()
            && self.notes.is_none()
    }
}

/// Sortable columns for the admin booking list.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    CheckIn,
    TotalPrice,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters for the admin booking list. All criteria are combined with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingFilter {
    pub user_id: Option<String>,
    pub status: Option<BookingStatus>,
    pub slipok_status: Option<SlipokStatus>,
    pub admin_status: Option<AdminStatus>,
    /// Matched against booking id, room number, user id, and notes.
    pub search: Option<String>,
    /// Inclusive lower bound on check-in date.
    pub check_in_from: Option<NaiveDate>,
    /// Inclusive upper bound on check-in date.
    pub check_in_to: Option<NaiveDate>,
    pub sort: SortField,
    pub order: SortOrder,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl Default for BookingFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            status: None,
            slipok_status: None,
            admin_status: None,
            search: None,
            check_in_from: None,
            check_in_to: None,
            sort: SortField::default(),
            order: SortOrder::default(),
            page: 1,
            per_page: 20,
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}
