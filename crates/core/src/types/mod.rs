//! Core types for AquaMart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod email;
pub mod id;
pub mod order_number;
pub mod price;
pub mod status;

pub use contact::{Phone, PhoneError, Pincode, PincodeError};
pub use email::{Email, EmailError};
pub use id::*;
pub use order_number::{OrderNumber, OrderNumberError};
pub use price::{CurrencyCode, Price, PriceError};
pub use status::*;
