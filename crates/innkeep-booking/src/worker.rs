// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background slip verification.
//!
//! Jobs are leased from the durable queue, checked against the provider
//! quota, verified, and written back through
//! [`BookingEngine::apply_verification_result`]. Delivery is at-least-once:
//! a job whose lease expires mid-flight is delivered again, and the
//! idempotent status update absorbs the duplicate.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use innkeep_config::model::WorkerConfig;
use innkeep_core::{
    BookingError, InnkeepError, SlipVerifier, SlipokStatus, VerificationOutcome,
};
use innkeep_storage::queries::queue::{self, FailOutcome};
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::BookingEngine;
use crate::payment::{ApplyOutcome, VERIFICATION_QUEUE, VerificationJob};

/// What happened to one dequeued job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobReport {
    /// The job ran to completion and was acknowledged.
    Completed {
        queue_id: i64,
        booking_id: String,
        status: SlipokStatus,
        outcome: ApplyOutcome,
    },
    /// The job was skipped without calling the provider because its slip
    /// was replaced or already settled.
    Skipped { queue_id: i64, booking_id: String },
    /// The job could not be processed and was returned to the queue.
    Failed {
        queue_id: i64,
        error: String,
        retry: FailOutcome,
    },
}

/// The `failed` outcome recorded when the provider call itself errored.
fn provider_failure(err: &BookingError) -> VerificationOutcome {
    let detail = match err {
        BookingError::Provider(message) => message.clone(),
        other => other.to_string(),
    };
    VerificationOutcome::failed(
        json!({ "error": detail, "kind": err.kind().to_string() }),
        format!("PROVIDER_ERROR: {detail}"),
    )
}

/// How often `run` sweeps finished jobs out of the queue.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

pub struct VerificationWorker {
    engine: BookingEngine,
    verifier: Arc<dyn SlipVerifier>,
    poll_interval: Duration,
    lease_secs: u64,
    retention: Option<chrono::Duration>,
}

impl VerificationWorker {
    pub fn new(
        engine: BookingEngine,
        verifier: Arc<dyn SlipVerifier>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            engine,
            verifier,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            lease_secs: config.lease_secs,
            retention: (config.retention_days > 0)
                .then(|| chrono::Duration::days(i64::from(config.retention_days))),
        }
    }

    /// Remove finished jobs older than the retention window. Returns rows removed.
    pub async fn purge_finished(&self) -> Result<u64, InnkeepError> {
        let Some(retention) = self.retention else {
            return Ok(0);
        };
        let cutoff: DateTime<Utc> = self.engine.now() - retention;
        let removed =
            queue::purge_finished(self.engine.database(), VERIFICATION_QUEUE, cutoff).await?;
        if removed > 0 {
            info!(removed, %cutoff, "purged finished verification jobs");
        }
        Ok(removed)
    }

    /// Lease and process one job. Returns `None` when the queue is empty.
    pub async fn process_next(&self) -> Result<Option<JobReport>, InnkeepError> {
        let db = self.engine.database();
        let Some(entry) = queue::dequeue(db, VERIFICATION_QUEUE, self.lease_secs).await? else {
            return Ok(None);
        };

        let job: VerificationJob = match serde_json::from_str(&entry.payload) {
            Ok(job) => job,
            Err(e) => {
                let message = format!("malformed verification job: {e}");
                error!(queue_id = entry.id, error = %e, "malformed verification job");
                let retry = queue::fail(db, entry.id, &message).await?;
                return Ok(Some(JobReport::Failed {
                    queue_id: entry.id,
                    error: message,
                    retry,
                }));
            }
        };

        // Skip the provider call for slips that no longer need it.
        match self.engine.get_booking(&job.booking_id).await {
            Ok(booking)
                if booking.slip_image_url.as_deref() != Some(job.slip_image_url.as_str())
                    || booking.slipok_status != SlipokStatus::Pending =>
            {
                debug!(booking_id = %job.booking_id, "verification no longer needed");
                queue::ack(db, entry.id).await?;
                return Ok(Some(JobReport::Skipped {
                    queue_id: entry.id,
                    booking_id: job.booking_id,
                }));
            }
            Ok(_) => {}
            Err(BookingError::NotFound { .. }) => {
                warn!(booking_id = %job.booking_id, "verification job for unknown booking");
                queue::ack(db, entry.id).await?;
                return Ok(Some(JobReport::Skipped {
                    queue_id: entry.id,
                    booking_id: job.booking_id,
                }));
            }
            Err(e) => return self.release(entry.id, e.to_string()).await,
        }

        let outcome = self.verify(&job).await;

        match self.engine.apply_verification_result(&job, &outcome).await {
            Ok(applied) => {
                queue::ack(db, entry.id).await?;
                Ok(Some(JobReport::Completed {
                    queue_id: entry.id,
                    booking_id: job.booking_id,
                    status: outcome.status,
                    outcome: applied,
                }))
            }
            Err(e) => self.release(entry.id, e.to_string()).await,
        }
    }

    /// Quota check, then the provider call. Never fails; provider errors
    /// become a `failed` outcome.
    async fn verify(&self, job: &VerificationJob) -> VerificationOutcome {
        match self.verifier.check_quota().await {
            Ok(quota) if quota.exceeded => {
                warn!(
                    booking_id = %job.booking_id,
                    used = quota.used,
                    limit = ?quota.limit,
                    "verification quota exhausted, skipping provider call"
                );
                return VerificationOutcome::quota_exceeded(
                    json!({ "quota": quota }),
                    "verification quota exhausted",
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "quota check failed, calling provider anyway"),
        }

        match self.call_provider(&job.slip_image_url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(booking_id = %job.booking_id, error = %e, "slip verification call failed");
                provider_failure(&e)
            }
        }
    }

    async fn call_provider(&self, image_url: &str) -> Result<VerificationOutcome, BookingError> {
        self.verifier
            .verify_slip(image_url)
            .await
            .map_err(|e| BookingError::Provider(e.to_string()))
    }

    async fn release(&self, queue_id: i64, message: String) -> Result<Option<JobReport>, InnkeepError> {
        let retry = queue::fail(self.engine.database(), queue_id, &message).await?;
        match retry {
            FailOutcome::Retrying { attempts } => {
                warn!(queue_id, attempts, error = %message, "verification job will be retried")
            }
            FailOutcome::Parked { attempts } => {
                error!(queue_id, attempts, error = %message, "verification job gave up")
            }
        }
        Ok(Some(JobReport::Failed {
            queue_id,
            error: message,
            retry,
        }))
    }

    /// Process jobs until the queue has nothing deliverable.
    pub async fn drain(&self) -> Result<Vec<JobReport>, InnkeepError> {
        let mut reports = Vec::new();
        while let Some(report) = self.process_next().await? {
            reports.push(report);
        }
        Ok(reports)
    }

    /// Run until `cancel` fires, waking on new uploads or every poll interval.
    pub async fn run(&self, cancel: CancellationToken) {
        let ready = self.engine.verification_signal();
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "verification worker started"
        );

        let mut last_purge: Option<Instant> = None;
        loop {
            if last_purge.is_none_or(|at| at.elapsed() >= PURGE_INTERVAL) {
                if let Err(e) = self.purge_finished().await {
                    warn!(error = %e, "failed to purge finished verification jobs");
                }
                last_purge = Some(Instant::now());
            }

            while !cancel.is_cancelled() {
                match self.process_next().await {
                    Ok(Some(report)) => debug!(?report, "verification job processed"),
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "verification queue unavailable");
                        break;
                    }
                }
            }

            tokio::select! {
                _ = ready.notified() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => {
                    info!("verification worker shutting down");
                    break;
                }
            }
        }
    }
}
