//! AquaMart Core - Shared domain types.
//!
//! This crate provides the types used across all AquaMart components:
//! - `storefront` - JSON API consumed by the React storefront and seller dashboard
//! - `cli` - Command-line tools for migrations, seller accounts and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, contact details and lifecycle statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
