//! Monetary amount validation.
//!
//! Prices are stored with the precision of a `DECIMAL(10, 2)` column: at most
//! two fractional digits and eight integral digits.

use rust_decimal::Decimal;

/// Maximum number of fractional digits a price may carry.
pub const MAX_MONEY_SCALE: u32 = 2;

/// Largest representable price, `99_999_999.99`.
fn max_money() -> Decimal {
	Decimal::new(9_999_999_999, MAX_MONEY_SCALE)
}

/// Checks that `value` is a non-negative amount with at most two decimals.
///
/// Trailing zeros do not count towards the scale, so `5.000` is accepted
/// while `5.001` is not.
pub fn validate_money(value: &Decimal) -> Result<(), String> {
	if value.is_sign_negative() && !value.is_zero() {
		return Err(format!("amount {} must not be negative", value));
	}
	if value.normalize().scale() > MAX_MONEY_SCALE {
		return Err(format!(
			"amount {} has more than {} decimal places",
			value, MAX_MONEY_SCALE
		));
	}
	if *value > max_money() {
		return Err(format!("amount {} exceeds maximum {}", value, max_money()));
	}
	Ok(())
}

/// Brings a validated amount to exactly two decimals, so `5` becomes `5.00`
/// and `3.500` becomes `3.50`.
pub fn to_money(value: Decimal) -> Decimal {
	let mut amount = value.round_dp(MAX_MONEY_SCALE);
	amount.rescale(MAX_MONEY_SCALE);
	amount
}
