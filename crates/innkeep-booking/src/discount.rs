// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retroactive discounts.
//!
//! A discount is an absolute amount taken off the booking's original total.
//! Applying another discount replaces the previous one; discounts never stack.
//! Earned loyalty points are left as they were.

use innkeep_core::money;
use innkeep_core::{AuditAction, Booking, BookingError, BookingStatus};
use rust_decimal::Decimal;
use tracing::info;

use crate::audit::{self, Entry};
use crate::engine::BookingEngine;
use crate::lifecycle::{load_booking, save};

/// Total after taking `discount` off `original`, or `None` if it would go negative.
pub(crate) fn discounted_total(original: Decimal, discount: Decimal) -> Option<Decimal> {
    let total = money::round_money(original - discount);
    (total >= Decimal::ZERO).then_some(total)
}

impl BookingEngine {
    pub async fn apply_discount(
        &self,
        booking_id: &str,
        amount: Decimal,
        reason: &str,
        admin_id: &str,
    ) -> Result<Booking, BookingError> {
        let amount = money::round_money(amount);
        if amount <= Decimal::ZERO {
            return Err(BookingError::Validation(
                "discount amount must be positive".into(),
            ));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BookingError::Validation(
                "a reason is required for a discount".into(),
            ));
        }

        let reason = reason.to_string();
        let booking_id = booking_id.to_string();
        let admin_id = admin_id.to_string();
        let deposit_ratio = self.policy.deposit_ratio;
        let now = self.now();

        let booking = self
            .write(move |tx| {
                let mut booking = load_booking(tx, &booking_id)?;
                if booking.status == BookingStatus::Cancelled {
                    return Err(BookingError::Validation(
                        "a cancelled booking cannot be discounted".into(),
                    ));
                }

                let original = booking.base_total();
                let total = discounted_total(original, amount).ok_or_else(|| {
                    BookingError::InvalidDiscount(format!(
                        "discount {amount} exceeds the original total {original}"
                    ))
                })?;

                let before = audit::financial_snapshot(&booking);
                booking.original_total = Some(original);
                booking.discount_amount = amount;
                booking.discount_reason = Some(reason.clone());
                booking.total_price = total;
                booking.payment_amount =
                    money::payment_amount(total, booking.payment_type, deposit_ratio);
                booking.updated_at = now;
                save(tx, &booking)?;

                audit::append(
                    tx,
                    &booking.id,
                    Entry {
                        action: AuditAction::DiscountApplied,
                        actor: Some(admin_id.as_str()),
                        before: Some(before),
                        after: Some(audit::financial_snapshot(&booking)),
                        notes: Some(reason.as_str()),
                    },
                    now,
                )?;
                Ok(booking)
            })
            .await?;

        info!(
            booking_id = %booking.id,
            discount = %booking.discount_amount,
            total = %booking.total_price,
            "discount applied"
        );
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discounted_total_rejects_overdraw() {
        let original = Decimal::new(2000, 0);
        assert_eq!(discounted_total(original, Decimal::new(300, 0)), Some(Decimal::new(1700, 0)));
        assert_eq!(discounted_total(original, original), Some(Decimal::ZERO));
        assert_eq!(discounted_total(original, Decimal::new(200001, 2)), None);
    }
}
