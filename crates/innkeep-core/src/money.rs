// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Money arithmetic on `rust_decimal`.
//!
//! Amounts carry two decimal places and round half away from zero. Storage
//! persists them as integer minor units so SQL ordering stays numeric.

use rust_decimal::prelude::*;

use crate::types::PaymentType;

const DECIMAL_PLACES: u32 = 2;

/// Round to two decimal places, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Stay total: nights times the nightly price.
pub fn stay_total(nightly_price: Decimal, nights: i64) -> Decimal {
    round_money(nightly_price * Decimal::from(nights))
}

/// Loyalty points for a total, floored to whole points.
pub fn points_for(total: Decimal, points_per_unit: u32) -> i64 {
    (total * Decimal::from(points_per_unit))
        .floor()
        .to_i64()
        .unwrap_or(0)
}

/// Amount due up front for `total` under `payment_type`.
///
/// `deposit_ratio` is the fraction of the total charged for a deposit (0.5 for half).
pub fn payment_amount(total: Decimal, payment_type: PaymentType, deposit_ratio: Decimal) -> Decimal {
    match payment_type {
        PaymentType::Deposit => round_money(total * deposit_ratio),
        PaymentType::Full => round_money(total),
    }
}

/// Deposit ratio from a whole-number percentage (50 -> 0.50).
pub fn ratio_from_percent(percent: u32) -> Decimal {
    Decimal::new(i64::from(percent), 2)
}

/// Convert to integer minor units (cents). `None` if out of `i64` range.
pub fn to_minor_units(value: Decimal) -> Option<i64> {
    (round_money(value) * Decimal::ONE_HUNDRED).to_i64()
}

pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, DECIMAL_PLACES)
}
