//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices, cart totals and order totals are all `Price` values in
//! rupees. Payment gateways want integer minor units (paise), so conversions
//! are explicit and fail on amounts that cannot be represented exactly.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors converting a [`Price`] to gateway minor units.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Negative amounts cannot be charged.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more precision than the currency allows.
    #[error("price has more than {0} decimal places")]
    TooPrecise(u32),
    /// The amount does not fit in an `i64` of minor units.
    #[error("price is too large")]
    Overflow,
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create an INR price.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Build a price from minor units (e.g. paise).
    #[must_use]
    pub fn from_minor_units(units: i64, currency_code: CurrencyCode) -> Self {
        Self::new(
            Decimal::new(units, currency_code.minor_unit_digits()),
            currency_code,
        )
    }

    /// Convert to integer minor units for payment gateways.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] for negative, over-precise or oversized amounts.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative);
        }
        let digits = self.currency_code.minor_unit_digits();
        let scaled = self.amount * Decimal::from(10_i64.pow(digits));
        if scaled.fract() != Decimal::ZERO {
            return Err(PriceError::TooPrecise(digits));
        }
        scaled.trunc().to_i64().ok_or(PriceError::Overflow)
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Add two prices of the same currency.
    ///
    /// Currency mismatches are a programming error; the left currency wins.
    #[must_use]
    pub fn plus(&self, other: &Self) -> Self {
        debug_assert_eq!(self.currency_code, other.currency_code);
        Self::new(self.amount + other.amount, self.currency_code)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.currency_code.minor_unit_digits() as usize;
        write!(
            f,
            "{}{:.digits$}",
            self.currency_code.symbol(),
            self.amount.round_dp(self.currency_code.minor_unit_digits())
        )
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }

    /// Three-letter code as used by payment gateways.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
        }
    }

    /// Number of decimal places in the minor unit.
    #[must_use]
    pub const fn minor_unit_digits(self) -> u32 {
        match self {
            Self::INR | Self::USD => 2,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn inr(s: &str) -> Price {
        Price::inr(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(inr("12499").to_minor_units(), Ok(1_249_900));
        assert_eq!(inr("49.5").to_minor_units(), Ok(4950));
        assert_eq!(inr("0").to_minor_units(), Ok(0));
    }

    #[test]
    fn test_to_minor_units_rejects_bad_amounts() {
        assert_eq!(inr("-1").to_minor_units(), Err(PriceError::Negative));
        assert_eq!(inr("10.005").to_minor_units(), Err(PriceError::TooPrecise(2)));
    }

    #[test]
    fn test_from_minor_units() {
        assert_eq!(Price::from_minor_units(1_249_900, CurrencyCode::INR), inr("12499.00"));
    }

    #[test]
    fn test_arithmetic() {
        let line = inr("1499.50").times(3);
        assert_eq!(line, inr("4498.50"));
        assert_eq!(line.plus(&inr("49")), inr("4547.50"));
    }

    #[test]
    fn test_display() {
        assert_eq!(inr("999").to_string(), "₹999.00");
        assert_eq!(inr("12.5").to_string(), "₹12.50");
    }
}
