// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Innkeep reservation engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use innkeep_core::PaymentType;
use serde::{Deserialize, Serialize};

/// Top-level Innkeep configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InnkeepConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pricing, points, and date policy for bookings.
    #[serde(default)]
    pub booking: BookingConfig,

    /// SlipOK verification provider settings.
    #[serde(default)]
    pub slipok: SlipokConfig,

    /// Background verification worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Process-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("innkeep").join("innkeep.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("innkeep.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Booking policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BookingConfig {
    /// Loyalty points earned per currency unit of the booking total.
    #[serde(default = "default_points_per_currency_unit")]
    pub points_per_currency_unit: u32,

    /// Share of the total charged for a deposit, as a whole percentage.
    #[serde(default = "default_deposit_percent")]
    pub deposit_percent: u32,

    /// Payment type used when a reservation request does not specify one.
    #[serde(default = "default_payment_type")]
    pub default_payment_type: PaymentType,

    /// Hotel timezone as minutes east of UTC; drives "today" for date rules.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            points_per_currency_unit: default_points_per_currency_unit(),
            deposit_percent: default_deposit_percent(),
            default_payment_type: default_payment_type(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

fn default_points_per_currency_unit() -> u32 {
    10
}

fn default_deposit_percent() -> u32 {
    50
}

fn default_payment_type() -> PaymentType {
    PaymentType::Deposit
}

fn default_utc_offset_minutes() -> i32 {
    420
}

/// SlipOK provider configuration.
///
/// Verification is disabled (every call reports `NOT_CONFIGURED`) unless both
/// `api_key` and `branch_id` are set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlipokConfig {
    /// API key sent in the `x-authorization` header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Branch identifier appended to the API URL.
    #[serde(default)]
    pub branch_id: Option<String>,

    /// Base endpoint; the branch id is appended as a path segment.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Public origin used to turn stored relative slip paths into absolute URLs.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum verification calls per calendar month. `None` means no local cap.
    #[serde(default)]
    pub monthly_quota: Option<u64>,
}

impl Default for SlipokConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            branch_id: None,
            api_url: default_api_url(),
            public_base_url: None,
            timeout_secs: default_timeout_secs(),
            monthly_quota: None,
        }
    }
}

fn default_api_url() -> String {
    "https://api.slipok.com/api/line/apikey".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Verification worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// How often the worker polls the queue when idle.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delivery attempts before a job is parked as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lease on a dequeued job; expired leases are redelivered.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Days finished jobs stay in the queue table. 0 keeps them forever.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            lease_secs: default_lease_secs(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_lease_secs() -> u64 {
    300
}

fn default_retention_days() -> u32 {
    7
}
