// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `innkeep worker` command implementation.
//!
//! Runs the slip verification worker against the configured database and
//! SlipOK account until SIGINT or SIGTERM.

use std::sync::Arc;

use innkeep_booking::VerificationWorker;
use innkeep_config::InnkeepConfig;
use innkeep_core::{BookingError, HealthStatus, PluginAdapter};
use innkeep_slipok::SlipokVerifier;
use tracing::{info, warn};

use crate::setup::{build_engine, open_database};
use crate::shutdown::install_signal_handler;

pub async fn run_worker(config: InnkeepConfig) -> Result<(), BookingError> {
    let db = open_database(&config).await?;
    let engine = build_engine(&config, &db);

    let verifier = SlipokVerifier::new(&config.slipok, db.clone()).await?;
    match verifier.health_check().await? {
        HealthStatus::Healthy => info!("SlipOK verifier healthy"),
        HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => {
            warn!(%reason, "SlipOK verifier degraded; slips will fail verification")
        }
    }

    let worker = VerificationWorker::new(engine, Arc::new(verifier), &config.worker);
    let cancel = install_signal_handler();
    worker.run(cancel).await;

    db.close().await?;
    info!("worker stopped");
    Ok(())
}
