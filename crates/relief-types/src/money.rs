use rust_decimal::Decimal;

/// Amounts carry at most this many fractional digits.
pub const SCALE: u32 = 2;

/// Convert an amount to whole centavos for storage, or `None` when the
/// centavo count does not fit in an `i64`.
///
/// Amounts are validated to two decimal places before they get here, so the
/// rounding step only normalizes representation (e.g. `5` vs `5.00`).
pub fn to_cents(amount: Decimal) -> Option<i64> {
    let mut scaled = amount.round_dp(SCALE);
    scaled.rescale(SCALE);
    // rescale stops short of SCALE when the mantissa would overflow
    if scaled.scale() != SCALE {
        return None;
    }
    i64::try_from(scaled.mantissa()).ok()
}

/// Inverse of [`to_cents`].
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

/// True when the amount has no more than two significant fractional digits.
pub fn has_valid_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= SCALE
}
