// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared startup: logging, database, and engine wiring.

use std::sync::Arc;

use innkeep_booking::{BookingEngine, BookingPolicy};
use innkeep_config::InnkeepConfig;
use innkeep_core::{InnkeepError, SystemClock};
use innkeep_loyalty::PointsLedger;
use innkeep_storage::Database;
use tracing::info;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("innkeep={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Open the configured database, applying pending migrations.
pub async fn open_database(config: &InnkeepConfig) -> Result<Database, InnkeepError> {
    Database::open_with(&config.storage.database_path, config.storage.wal_mode).await
}

/// Engine backed by the SQLite points ledger and the wall clock.
pub fn build_engine(config: &InnkeepConfig, db: &Database) -> BookingEngine {
    let policy = BookingPolicy::from_config(config);
    info!(
        points_per_unit = policy.points_per_currency_unit,
        deposit_ratio = %policy.deposit_ratio,
        utc_offset_minutes = policy.utc_offset_minutes,
        "booking engine ready"
    );
    BookingEngine::new(
        db.clone(),
        Arc::new(PointsLedger::new(db.clone())),
        Arc::new(SystemClock),
        policy,
    )
}
