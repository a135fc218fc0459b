//! Delivery addresses.
//!
//! [`ShippingAddress`] is the value object copied onto orders and bookings so
//! later edits to the address book never change what was shipped. [`Address`]
//! is a saved address-book entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aquamart_core::{AddressId, Phone, Pincode, UserId};

use super::{ValidationError, check_length};

/// Recipient and location for a delivery or service visit.
///
/// Phone and pincode are validated while deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: Phone,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: Pincode,
}

impl ShippingAddress {
    /// Validate free-text fields.
    ///
    /// # Errors
    ///
    /// Returns the first field that is empty or too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_length("name", &self.name, 2, 60)?;
        check_length("line1", &self.line1, 1, 200)?;
        if let Some(line2) = &self.line2 {
            check_length("line2", line2, 0, 200)?;
        }
        check_length("city", &self.city, 2, 60)?;
        check_length("state", &self.state, 2, 60)?;
        Ok(())
    }

    /// Single-line rendering for emails and courier labels.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.trim()];
        if let Some(line2) = self.line2.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            parts.push(line2);
        }
        parts.push(self.city.trim());
        parts.push(self.state.trim());
        format!("{} - {}", parts.join(", "), self.pincode)
    }
}

/// A saved address-book entry.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    #[serde(skip)]
    pub user_id: UserId,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub phone: Phone,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    #[sqlx(try_from = "String")]
    pub pincode: Pincode,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Copy into an order/booking snapshot.
    #[must_use]
    pub fn to_shipping(&self) -> ShippingAddress {
        ShippingAddress {
            name: self.name.clone(),
            phone: self.phone.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            pincode: self.pincode.clone(),
        }
    }
}

/// Request body for saving an address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    #[serde(flatten)]
    pub address: ShippingAddress,
    #[serde(default)]
    pub is_default: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> ShippingAddress {
        serde_json::from_value(serde_json::json!({
            "name": "Asha Rao",
            "phone": "+91 98450 12345",
            "line1": "12, 4th Cross",
            "line2": "Indiranagar",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pincode": "560038"
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_normalizes_phone() {
        assert_eq!(sample().phone.as_str(), "9845012345");
    }

    #[test]
    fn test_deserialize_rejects_bad_pincode() {
        let result: Result<ShippingAddress, _> = serde_json::from_value(serde_json::json!({
            "name": "Asha Rao",
            "phone": "9845012345",
            "line1": "12, 4th Cross",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pincode": "56003"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_lengths() {
        assert!(sample().validate().is_ok());
        let mut address = sample();
        address.city = " ".to_string();
        assert_eq!(address.validate().unwrap_err().field, "city");
    }

    #[test]
    fn test_one_line() {
        assert_eq!(
            sample().one_line(),
            "12, 4th Cross, Indiranagar, Bengaluru, Karnataka - 560038"
        );
    }

    #[test]
    fn test_address_input_flattens() {
        let input: AddressInput = serde_json::from_value(serde_json::json!({
            "name": "Asha Rao",
            "phone": "9845012345",
            "line1": "12, 4th Cross",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pincode": "560038",
            "is_default": true
        }))
        .unwrap();
        assert!(input.is_default);
        assert_eq!(input.address.line2, None);
    }
}
