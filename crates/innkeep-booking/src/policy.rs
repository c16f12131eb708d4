// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pricing and scheduling rules the engine applies.

use innkeep_config::InnkeepConfig;
use innkeep_core::PaymentType;
use innkeep_core::money::ratio_from_percent;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct BookingPolicy {
    pub points_per_currency_unit: u32,
    /// Fraction of the total charged as a deposit (0.5 for 50%).
    pub deposit_ratio: Decimal,
    pub default_payment_type: PaymentType,
    /// Hotel timezone, minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// Delivery attempts for each verification job.
    pub verification_max_attempts: i32,
}

impl BookingPolicy {
    pub fn from_config(config: &InnkeepConfig) -> Self {
        Self {
            points_per_currency_unit: config.booking.points_per_currency_unit,
            deposit_ratio: ratio_from_percent(config.booking.deposit_percent),
            default_payment_type: config.booking.default_payment_type,
            utc_offset_minutes: config.booking.utc_offset_minutes,
            verification_max_attempts: i32::try_from(config.worker.max_attempts)
                .unwrap_or(i32::MAX),
        }
    }
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self::from_config(&InnkeepConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_config_defaults() {
        let policy = BookingPolicy::default();
        assert_eq!(policy.points_per_currency_unit, 10);
        assert_eq!(policy.deposit_ratio, Decimal::new(50, 2));
        assert_eq!(policy.default_payment_type, PaymentType::Deposit);
        assert_eq!(policy.utc_offset_minutes, 420);
        assert_eq!(policy.verification_max_attempts, 3);
    }
}
