//! Status enums for orders, payments, bookings and accounts.
//!
//! All enums are stored as `TEXT` and serialized as `snake_case` strings.
//! [`OrderStatus`] and [`BookingStatus`] also carry their transition rules so
//! every writer (customer, seller, payment callback, courier webhook) applies
//! the same checks.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown status string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, `Display`, `FromStr` and (with `postgres`) `TEXT`
/// encoding for a fieldless enum.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored/serialized representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let s = <&str as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(s.parse::<Self>()?)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <&str as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

// =============================================================================
// Accounts
// =============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Shops, books services, tracks own orders.
    #[default]
    Customer,
    /// Manages the catalog, fulfils orders and bookings.
    Seller,
}

text_enum!(UserRole, "user role", {
    Customer => "customer",
    Seller => "seller",
});

// =============================================================================
// Orders
// =============================================================================

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting payment (online) or confirmation.
    #[default]
    Pending,
    /// Paid online or accepted as cash on delivery.
    Confirmed,
    /// Being packed; shipment booked with the courier.
    Processing,
    /// Picked up by the courier.
    Shipped,
    /// Moving between courier hubs.
    InTransit,
    /// With the delivery agent.
    OutForDelivery,
    /// Handed to the customer.
    Delivered,
    /// Cancelled before dispatch.
    Cancelled,
    /// Returned to origin (RTO) or returned by the customer.
    Returned,
}

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    InTransit => "in_transit",
    OutForDelivery => "out_for_delivery",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Returned => "returned",
});

impl OrderStatus {
    /// Position along the forward delivery path, `None` for cancelled/returned.
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Processing => Some(2),
            Self::Shipped => Some(3),
            Self::InTransit => Some(4),
            Self::OutForDelivery => Some(5),
            Self::Delivered => Some(6),
            Self::Cancelled | Self::Returned => None,
        }
    }

    /// No further changes are expected.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Returned)
    }

    /// The parcel has left the warehouse.
    #[must_use]
    pub const fn is_dispatched(self) -> bool {
        matches!(
            self,
            Self::Shipped | Self::InTransit | Self::OutForDelivery | Self::Delivered
        )
    }

    /// Customers may cancel until the shipment is booked.
    #[must_use]
    pub const fn is_cancellable_by_customer(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether moving from `self` to `next` is a valid lifecycle step.
    ///
    /// Only forward moves along the delivery path are allowed (skipping steps
    /// is fine, couriers do not report every scan). Cancellation is possible
    /// until dispatch, return only after it. Cancelled and returned orders are
    /// final, and delivered orders can only be returned.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return false;
        }
        match (self, next) {
            (Self::Cancelled | Self::Returned, _) => false,
            (_, Self::Cancelled) => matches!(self, Self::Pending | Self::Confirmed | Self::Processing),
            (_, Self::Returned) => self.is_dispatched(),
            (Self::Delivered, _) => false,
            (from, to) => match (from.rank(), to.rank()) {
                (Some(a), Some(b)) => b > a,
                _ => false,
            },
        }
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Not yet paid (always the case for undelivered COD orders).
    #[default]
    Pending,
    /// Captured by the gateway or collected on delivery.
    Paid,
    /// Gateway reported a failure or the signature did not verify.
    Failed,
    /// Money is owed back to the customer.
    Refunded,
}

text_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    /// Razorpay checkout.
    Online,
}

text_enum!(PaymentMethod, "payment method", {
    Cod => "cod",
    Online => "online",
});

/// Who caused a status change, kept in the order history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    Customer,
    Seller,
    Payment,
    Webhook,
    System,
}

text_enum!(StatusSource, "status source", {
    Customer => "customer",
    Seller => "seller",
    Payment => "payment",
    Webhook => "webhook",
    System => "system",
});

// =============================================================================
// Service bookings
// =============================================================================

/// Kind of service visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Installation,
    Repair,
    FilterReplacement,
    /// Annual maintenance contract visit.
    Amc,
    Inspection,
}

text_enum!(ServiceKind, "service kind", {
    Installation => "installation",
    Repair => "repair",
    FilterReplacement => "filter_replacement",
    Amc => "amc",
    Inspection => "inspection",
});

impl ServiceKind {
    /// Human readable label for emails and notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Installation => "Installation",
            Self::Repair => "Repair",
            Self::FilterReplacement => "Filter replacement",
            Self::Amc => "Annual maintenance",
            Self::Inspection => "Inspection",
        }
    }
}

/// Preferred visit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    /// 9am - 12pm.
    Morning,
    /// 12pm - 4pm.
    Afternoon,
    /// 4pm - 7pm.
    Evening,
}

text_enum!(TimeSlot, "time slot", {
    Morning => "morning",
    Afternoon => "afternoon",
    Evening => "evening",
});

/// Service booking lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Requested,
    Scheduled,
    Completed,
    Cancelled,
}

text_enum!(BookingStatus, "booking status", {
    Requested => "requested",
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl BookingStatus {
    /// Whether the booking can still be cancelled.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Requested | Self::Scheduled)
    }

    /// Forward-only: requested → scheduled → completed, cancel while open.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Requested, Self::Scheduled | Self::Completed | Self::Cancelled) => true,
            (Self::Scheduled, Self::Completed | Self::Cancelled) => true,
            _ => false,
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Category of an in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderPlaced,
    OrderStatus,
    Payment,
    Booking,
    System,
}

text_enum!(NotificationKind, "notification kind", {
    OrderPlaced => "order_placed",
    OrderStatus => "order_status",
    Payment => "payment",
    Booking => "booking",
    System => "system",
});
