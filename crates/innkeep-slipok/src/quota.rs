// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monthly verification quota.
//!
//! The tracker keeps an in-memory count of this month's provider calls and
//! compares it against the configured cap. It emits a `tracing::warn` at 80%
//! of the cap and reports the quota as exceeded once the cap is reached or
//! the provider itself has answered with a quota error.
//!
//! On restart, `from_usage()` re-hydrates the count from the usage table so
//! enforcement survives process restarts.

use chrono::{DateTime, Datelike, Utc};
use innkeep_core::{InnkeepError, QuotaStatus};
use tracing::warn;

use crate::usage::UsageLedger;

/// In-memory monthly quota tracker.
#[derive(Debug)]
pub struct QuotaTracker {
    used: u64,
    /// Monthly cap (None = only the provider decides).
    limit: Option<u64>,
    /// Set when the provider reported its quota as exhausted; cleared at month rollover.
    provider_exhausted: bool,
    /// (year, month) for rollover detection.
    current_month: (i32, u32),
}

impl QuotaTracker {
    pub fn new(limit: Option<u64>, now: DateTime<Utc>) -> Self {
        Self {
            used: 0,
            limit,
            provider_exhausted: false,
            current_month: (now.year(), now.month()),
        }
    }

    /// Tracker initialized from the calls already recorded this month.
    pub async fn from_usage(
        limit: Option<u64>,
        usage: &UsageLedger,
        now: DateTime<Utc>,
    ) -> Result<Self, InnkeepError> {
        let used = usage.monthly_count(now).await?;
        Ok(Self {
            used,
            ..Self::new(limit, now)
        })
    }

    /// Current quota state. Warns when usage is at or above 80% of the cap.
    pub fn check(&mut self, now: DateTime<Utc>) -> QuotaStatus {
        self.maybe_reset(now);

        let mut exceeded = self.provider_exhausted;
        if let Some(limit) = self.limit {
            if self.used >= limit {
                exceeded = true;
            } else if self.used * 5 >= limit * 4 {
                warn!(used = self.used, limit, "approaching monthly SlipOK quota (80%+)");
            }
        }

        QuotaStatus {
            exceeded,
            used: self.used,
            limit: self.limit,
        }
    }

    /// Count one call that reached the provider.
    pub fn record_call(&mut self, now: DateTime<Utc>) {
        self.maybe_reset(now);
        self.used += 1;
    }

    /// The provider answered with a quota error; refuse calls until next month.
    pub fn mark_exhausted(&mut self, now: DateTime<Utc>) {
        self.maybe_reset(now);
        self.provider_exhausted = true;
    }

    fn maybe_reset(&mut self, now: DateTime<Utc>) {
        let month = (now.year(), now.month());
        if month != self.current_month {
            self.used = 0;
            self.provider_exhausted = false;
            self.current_month = month;
        }
    }

    pub fn used(&self) -> u64 {
        self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use innkeep_core::SlipokStatus;
    use innkeep_storage::Database;

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn under_cap_is_not_exceeded() {
        let mut tracker = QuotaTracker::new(Some(10), at(6, 1));
        tracker.record_call(at(6, 1));
        let status = tracker.check(at(6, 1));
        assert!(!status.exceeded);
        assert_eq!(status.used, 1);
        assert_eq!(status.limit, Some(10));
    }

    #[test]
    fn reaching_cap_is_exceeded() {
        let mut tracker = QuotaTracker::new(Some(2), at(6, 1));
        tracker.record_call(at(6, 1));
        tracker.record_call(at(6, 2));
        assert!(tracker.check(at(6, 3)).exceeded);
    }

    #[test]
    fn warning_band_is_not_exceeded() {
        let mut tracker = QuotaTracker::new(Some(10), at(6, 1));
        for _ in 0..9 {
            tracker.record_call(at(6, 1));
        }
        assert!(!tracker.check(at(6, 1)).exceeded);
    }

    #[test]
    fn no_cap_only_trips_on_provider_error() {
        let mut tracker = QuotaTracker::new(None, at(6, 1));
        for _ in 0..1000 {
            tracker.record_call(at(6, 1));
        }
        assert!(!tracker.check(at(6, 1)).exceeded);

        tracker.mark_exhausted(at(6, 2));
        assert!(tracker.check(at(6, 2)).exceeded);
    }

    #[test]
    fn month_rollover_resets_usage_and_exhaustion() {
        let mut tracker = QuotaTracker::new(Some(1), at(6, 1));
        tracker.record_call(at(6, 1));
        tracker.mark_exhausted(at(6, 1));
        assert!(tracker.check(at(6, 30)).exceeded);

        let status = tracker.check(at(7, 1));
        assert!(!status.exceeded);
        assert_eq!(status.used, 0);
    }

    #[tokio::test]
    async fn from_usage_initializes_count() {
        let db = Database::open_in_memory().await.unwrap();
        let usage = UsageLedger::new(db);
        usage.record(SlipokStatus::Verified, at(6, 1)).await.unwrap();
        usage.record(SlipokStatus::Failed, at(6, 2)).await.unwrap();
        usage.record(SlipokStatus::Verified, at(5, 2)).await.unwrap();

        let tracker = QuotaTracker::from_usage(Some(100), &usage, at(6, 15)).await.unwrap();
        assert_eq!(tracker.used(), 2);
    }
}
