//! Indian phone number and postal code types used on addresses and accounts.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input contains characters other than digits, spaces, dashes or a leading `+`.
    #[error("phone number contains invalid characters")]
    InvalidCharacters,
    /// Wrong number of digits after removing the country/trunk prefix.
    #[error("phone number must have 10 digits")]
    WrongLength,
    /// Mobile numbers start with 6, 7, 8 or 9.
    #[error("phone number must start with 6, 7, 8 or 9")]
    InvalidPrefix,
}

/// A 10-digit Indian mobile number.
///
/// Accepts `+91`, `91` and `0` prefixes as well as spaces and dashes, and
/// stores the bare 10 digits.
///
/// ```
/// use aquamart_core::Phone;
///
/// assert_eq!(Phone::parse("+91 98765-43210").unwrap().as_str(), "9876543210");
/// assert!(Phone::parse("12345").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] if the input is not a valid Indian mobile number.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        let body = s.strip_prefix('+').unwrap_or(s);

        if !body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
        {
            return Err(PhoneError::InvalidCharacters);
        }

        let digits: String = body.chars().filter(char::is_ascii_digit).collect();
        let national = match digits.len() {
            10 => Some(digits.as_str()),
            11 => digits.strip_prefix('0'),
            12 => digits.strip_prefix("91"),
            _ => None,
        }
        .ok_or(PhoneError::WrongLength)?;

        if !national.starts_with(['6', '7', '8', '9']) {
            return Err(PhoneError::InvalidPrefix);
        }

        Ok(Self(national.to_owned()))
    }

    /// Returns the 10 digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number in E.164 form (`+91XXXXXXXXXX`).
    #[must_use]
    pub fn e164(&self) -> String {
        format!("+91{}", self.0)
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

/// Errors that can occur when parsing a [`Pincode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PincodeError {
    /// Not exactly six ASCII digits.
    #[error("pincode must be exactly 6 digits")]
    Malformed,
    /// Postal codes never start with zero.
    #[error("pincode cannot start with 0")]
    LeadingZero,
}

/// A six-digit Indian postal index number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pincode(String);

impl Pincode {
    /// Parse a pincode.
    ///
    /// # Errors
    ///
    /// Returns a [`PincodeError`] if the input is not six digits or starts with 0.
    pub fn parse(s: &str) -> Result<Self, PincodeError> {
        let s = s.trim();
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PincodeError::Malformed);
        }
        if s.starts_with('0') {
            return Err(PincodeError::LeadingZero);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the pincode digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pincode {
    type Error = PincodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pincode> for String {
    fn from(pincode: Pincode) -> Self {
        pincode.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_accepts_common_formats() {
        for input in ["9876543210", "+919876543210", "919876543210", "09876543210", "98765 43210", "+91-98765-43210"] {
            assert_eq!(Phone::parse(input).unwrap().as_str(), "9876543210", "{input}");
        }
    }

    #[test]
    fn test_phone_rejects_invalid() {
        assert_eq!(Phone::parse("98765"), Err(PhoneError::WrongLength));
        assert_eq!(Phone::parse("5876543210"), Err(PhoneError::InvalidPrefix));
        assert_eq!(Phone::parse("98765x3210"), Err(PhoneError::InvalidCharacters));
        assert_eq!(Phone::parse("449876543210"), Err(PhoneError::WrongLength));
    }

    #[test]
    fn test_phone_e164() {
        assert_eq!(Phone::parse("7012345678").unwrap().e164(), "+917012345678");
    }

    #[test]
    fn test_pincode() {
        assert_eq!(Pincode::parse(" 560001 ").unwrap().as_str(), "560001");
        assert_eq!(Pincode::parse("56001"), Err(PincodeError::Malformed));
        assert_eq!(Pincode::parse("56000a"), Err(PincodeError::Malformed));
        assert_eq!(Pincode::parse("060001"), Err(PincodeError::LeadingZero));
    }

    #[test]
    fn test_deserialize_validates() {
        let phone: Phone = serde_json::from_str("\"+91 9000012345\"").unwrap();
        assert_eq!(phone.as_str(), "9000012345");
        assert!(serde_json::from_str::<Pincode>("\"12\"").is_err());
    }
}
