// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free inventory over a stay.
//!
//! A room is free for `[check_in, check_out)` when it is active, has no
//! blocked date inside the range, and no confirmed booking overlaps it.
//! Cancelled and completed bookings never hold inventory.

use chrono::NaiveDate;
use innkeep_core::{BookingError, CategoryAvailability, Room};
use innkeep_storage::queries::catalog;
use innkeep_storage::sql_err;

use crate::engine::BookingEngine;

/// Reject zero-night and inverted stays.
pub(crate) fn validate_range(check_in: NaiveDate, check_out: NaiveDate) -> Result<(), BookingError> {
    if check_out <= check_in {
        return Err(BookingError::Validation(format!(
            "check-out {check_out} must be after check-in {check_in}"
        )));
    }
    Ok(())
}

impl BookingEngine {
    /// Rooms of a category free for the whole stay, ordered by room number.
    pub async fn available_rooms(
        &self,
        category_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<Room>, BookingError> {
        validate_range(check_in, check_out)?;
        self.read(move |conn| {
            if catalog::category_by_id(conn, category_id)
                .map_err(sql_err)?
                .is_none()
            {
                return Err(BookingError::not_found("room category", category_id.to_string()));
            }
            catalog::available_rooms_in(conn, category_id, check_in, check_out)
                .map_err(|e| sql_err(e).into())
        })
        .await
    }

    /// Free-room counts for every active category.
    pub async fn availability_summary(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<CategoryAvailability>, BookingError> {
        validate_range(check_in, check_out)?;
        self.read(move |conn| {
            catalog::categories_with_availability_in(conn, check_in, check_out)
                .map_err(|e| sql_err(e).into())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn zero_night_and_inverted_ranges_are_rejected() {
        assert!(validate_range(date("2025-06-01"), date("2025-06-02")).is_ok());
        assert!(matches!(
            validate_range(date("2025-06-01"), date("2025-06-01")),
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(
            validate_range(date("2025-06-03"), date("2025-06-01")),
            Err(BookingError::Validation(_))
        ));
    }
}
