// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time source abstraction.
//!
//! Date comparisons (past check-in, completion) use the hotel's local date,
//! derived from UTC and a fixed offset.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Supplies the current instant.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The calendar date at `now` in a timezone `offset_minutes` east of UTC.
///
/// Offsets outside +/-24h fall back to UTC.
pub fn local_date(now: DateTime<Utc>, offset_minutes: i32) -> NaiveDate {
    match FixedOffset::east_opt(offset_minutes * 60) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}
