use relief_types::api::FeeBreakdown;
use relief_types::models::Donation;
use relief_types::money::{SCALE, has_valid_scale};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{CoreError, CoreResult};

/// Gross amount bounds accepted for a single donation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DonationLimits {
    pub min: Decimal,
    pub max: Decimal,
}

impl Default for DonationLimits {
    fn default() -> Self {
        Self {
            min: Decimal::from(10),
            max: Decimal::from(1_000_000),
        }
    }
}

impl DonationLimits {
    pub fn check(&self, amount: Decimal) -> CoreResult<()> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::validation("amount must be positive"));
        }
        if !has_valid_scale(amount) {
            return Err(CoreError::validation("amount must have at most two decimal places"));
        }
        if amount < self.min {
            return Err(CoreError::Validation(format!("minimum donation is {}", self.min)));
        }
        if amount > self.max {
            return Err(CoreError::Validation(format!("maximum donation is {}", self.max)));
        }
        Ok(())
    }
}

/// Split a gross amount into processing fee (2.5%), platform fee
/// (0.25 per complete 10 units) and net.
///
/// The net is derived from the already-rounded fees, so
/// `net == amount - processing - platform` holds exactly.
pub fn calculate_fees(amount: Decimal) -> FeeBreakdown {
    let processing_fee = round(amount * Decimal::new(25, 3));
    let platform_fee = round((amount / Decimal::TEN).floor() * Decimal::new(25, 2));
    let total_fees = processing_fee + platform_fee;

    FeeBreakdown {
        processing_fee,
        platform_fee,
        total_fees,
        net_amount: round(amount - total_fees),
    }
}

/// Fee breakdown as recorded on a donation. Fees are never recomputed
/// after creation.
pub fn recorded_fees(donation: &Donation) -> FeeBreakdown {
    FeeBreakdown {
        processing_fee: donation.processing_fee,
        platform_fee: donation.platform_fee,
        total_fees: donation.processing_fee + donation.platform_fee,
        net_amount: donation.net_amount,
    }
}

/// Breakdown for donations that carry no fees (in-kind).
pub fn no_fees(amount: Decimal) -> FeeBreakdown {
    FeeBreakdown {
        processing_fee: Decimal::ZERO,
        platform_fee: Decimal::ZERO,
        total_fees: Decimal::ZERO,
        net_amount: amount,
    }
}

fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn hundred_pesos() {
        let fees = calculate_fees(d("100"));
        assert_eq!(fees.processing_fee, d("2.50"));
        assert_eq!(fees.platform_fee, d("2.50"));
        assert_eq!(fees.total_fees, d("5.00"));
        assert_eq!(fees.net_amount, d("95.00"));
    }

    #[test]
    fn platform_fee_counts_complete_tens_only() {
        assert_eq!(calculate_fees(d("19.99")).platform_fee, d("0.25"));
        assert_eq!(calculate_fees(d("20")).platform_fee, d("0.50"));
    }

    #[test]
    fn processing_fee_rounds_half_away_from_zero() {
        // 0.025 * 10.10 = 0.2525
        assert_eq!(calculate_fees(d("10.10")).processing_fee, d("0.25"));
        // 0.025 * 10.30 = 0.2575
        assert_eq!(calculate_fees(d("10.30")).processing_fee, d("0.26"));
        // 0.025 * 10.50 = 0.2625
        assert_eq!(calculate_fees(d("10.50")).processing_fee, d("0.26"));
        // 0.025 * 11.00 = 0.275
        assert_eq!(calculate_fees(d("11")).processing_fee, d("0.28"));
    }

    #[test]
    fn net_identity_holds_across_range() {
        let mut amount = d("10");
        while amount < d("2000") {
            let fees = calculate_fees(amount);
            assert_eq!(fees.net_amount, amount - fees.processing_fee - fees.platform_fee);
            for v in [fees.processing_fee, fees.platform_fee, fees.net_amount] {
                assert!(has_valid_scale(v), "{} has too many decimals", v);
            }
            amount += d("7.33");
        }
    }

    #[test]
    fn five_thousand() {
        let fees = calculate_fees(d("5000"));
        assert_eq!(fees.processing_fee, d("125"));
        assert_eq!(fees.platform_fee, d("125"));
        assert_eq!(fees.net_amount, d("4750"));
    }

    #[test]
    fn limits_reject_out_of_range_and_fractional_cents() {
        let limits = DonationLimits::default();
        assert!(limits.check(d("10")).is_ok());
        assert!(limits.check(d("1000000")).is_ok());
        assert!(matches!(limits.check(d("9.99")), Err(CoreError::Validation(_))));
        assert!(matches!(limits.check(d("1000000.01")), Err(CoreError::Validation(_))));
        assert!(matches!(limits.check(d("-5")), Err(CoreError::Validation(_))));
        assert!(matches!(limits.check(d("10.001")), Err(CoreError::Validation(_))));
    }
}
