//! Human-facing order numbers.
//!
//! Order numbers look like `AQ241016482913`: the `AQ` prefix, the order date
//! as `YYMMDD` and a six digit serial. They are printed on invoices, used as
//! the Razorpay receipt and sent to the courier as the merchant order id.

use core::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

const PREFIX: &str = "AQ";
const SERIAL_MAX: u32 = 999_999;

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    #[error("order number must start with AQ")]
    MissingPrefix,
    #[error("order number must have 12 digits after the prefix")]
    Malformed,
    #[error("order number contains an invalid date")]
    InvalidDate,
    #[error("order serial must be at most 6 digits")]
    SerialOutOfRange,
}

/// An `AQYYMMDDNNNNNN` order number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Build an order number from the order date and a serial.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNumberError::SerialOutOfRange`] if `serial` has more
    /// than six digits.
    pub fn new(date: NaiveDate, serial: u32) -> Result<Self, OrderNumberError> {
        if serial > SERIAL_MAX {
            return Err(OrderNumberError::SerialOutOfRange);
        }
        Ok(Self(format!(
            "{PREFIX}{:02}{:02}{:02}{serial:06}",
            date.year().rem_euclid(100),
            date.month(),
            date.day()
        )))
    }

    /// Parse and validate an order number.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderNumberError`] if the input is not a well-formed order number.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let s = s.trim().to_ascii_uppercase();
        let digits = s.strip_prefix(PREFIX).ok_or(OrderNumberError::MissingPrefix)?;
        if digits.len() != 12 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::Malformed);
        }
        let (date, _serial) = digits.split_at(6);
        NaiveDate::parse_from_str(&format!("20{date}"), "%Y%m%d")
            .map_err(|_| OrderNumberError::InvalidDate)?;
        Ok(Self(s))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
