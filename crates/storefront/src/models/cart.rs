//! Cart lines and price totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aquamart_core::ProductId;

use super::ValidationError;
use super::product::ProductImage;
use crate::config::ShopConfig;

/// Maximum quantity of a single product per cart line.
pub const MAX_QUANTITY_PER_LINE: i32 = 10;

/// A cart line joined with its product.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLineRow {
    pub product_id: ProductId,
    pub quantity: i32,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
    #[sqlx(json)]
    pub images: Vec<ProductImage>,
}

/// A priced cart line as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub stock: i32,
    pub is_active: bool,
    pub quantity: i32,
    pub line_total: Decimal,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            line_total: row.price * Decimal::from(row.quantity),
            image: row.images.into_iter().next().map(|i| i.url),
            product_id: row.product_id,
            name: row.name,
            slug: row.slug,
            price: row.price,
            stock: row.stock,
            is_active: row.is_active,
            quantity: row.quantity,
        }
    }
}

impl CartLine {
    /// Whether this line can be checked out as-is.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.is_active && self.stock >= self.quantity
    }
}

/// Subtotal, shipping and grand total for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// Apply the shop's shipping rule to a subtotal.
    ///
    /// Empty carts cost nothing; otherwise shipping is charged below the
    /// free-shipping threshold.
    #[must_use]
    pub fn for_subtotal(subtotal: Decimal, shop: &ShopConfig) -> Self {
        let shipping_fee = if subtotal.is_zero() || subtotal >= shop.free_shipping_threshold {
            Decimal::ZERO
        } else {
            shop.shipping_fee
        };
        Self {
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
        }
    }
}

/// The whole cart as returned by `GET /api/cart`.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    #[serde(flatten)]
    pub totals: Totals,
    /// Sum of quantities.
    pub item_count: i32,
    /// Amount still needed for free shipping, absent once reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_shipping_remaining: Option<Decimal>,
}

impl CartSummary {
    /// Price the given lines.
    #[must_use]
    pub fn new(items: Vec<CartLine>, shop: &ShopConfig) -> Self {
        let subtotal = items.iter().map(|l| l.line_total).sum::<Decimal>();
        let totals = Totals::for_subtotal(subtotal, shop);
        let item_count = items.iter().map(|l| l.quantity).sum();
        let free_shipping_remaining = (!items.is_empty()
            && subtotal < shop.free_shipping_threshold)
            .then(|| shop.free_shipping_threshold - subtotal);
        Self {
            items,
            totals,
            item_count,
            free_shipping_remaining,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Request body for `POST /api/cart/items`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Request body for `PUT /api/cart/items/{product_id}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UpdateCartItem {
    pub quantity: i32,
}

/// Check a requested line quantity. `allow_zero` permits removal via update.
///
/// # Errors
///
/// Returns a [`ValidationError`] when the quantity is out of range.
pub fn validate_quantity(quantity: i32, allow_zero: bool) -> Result<(), ValidationError> {
    let min = i32::from(!allow_zero);
    if quantity < min || quantity > MAX_QUANTITY_PER_LINE {
        return Err(ValidationError::new(
            "quantity",
            format!("must be between {min} and {MAX_QUANTITY_PER_LINE}"),
        ));
    }
    Ok(())
}

/// Quantity after merging `requested` into an existing line, capped by the
/// per-line maximum and available stock.
#[must_use]
pub fn merged_quantity(existing: i32, requested: i32, stock: i32) -> i32 {
    existing
        .saturating_add(requested)
        .min(MAX_QUANTITY_PER_LINE)
        .min(stock)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shop() -> ShopConfig {
        ShopConfig::default()
    }

    fn line(price: i64, quantity: i32) -> CartLine {
        CartLine::from(CartLineRow {
            product_id: ProductId::new(1),
            quantity,
            name: "Carbon filter".to_string(),
            slug: "carbon-filter".to_string(),
            price: Decimal::from(price),
            stock: 5,
            is_active: true,
            images: vec![ProductImage {
                url: "https://res.cloudinary.com/demo/image/upload/a.jpg".to_string(),
                public_id: "aquamart/a".to_string(),
            }],
        })
    }

    #[test]
    fn test_line_total_and_thumbnail() {
        let line = line(250, 3);
        assert_eq!(line.line_total, Decimal::from(750));
        assert!(line.image.unwrap().ends_with("a.jpg"));
    }

    #[test]
    fn test_shipping_below_threshold() {
        let summary = CartSummary::new(vec![line(250, 2)], &shop());
        assert_eq!(summary.totals.subtotal, Decimal::from(500));
        assert_eq!(summary.totals.shipping_fee, Decimal::from(49));
        assert_eq!(summary.totals.total, Decimal::from(549));
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.free_shipping_remaining, Some(Decimal::from(499)));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let summary = CartSummary::new(vec![line(333, 3)], &shop());
        assert_eq!(summary.totals.subtotal, Decimal::from(999));
        assert_eq!(summary.totals.shipping_fee, Decimal::ZERO);
        assert_eq!(summary.free_shipping_remaining, None);
    }

    #[test]
    fn test_empty_cart_costs_nothing() {
        let summary = CartSummary::new(Vec::new(), &shop());
        assert!(summary.is_empty());
        assert_eq!(summary.totals.total, Decimal::ZERO);
        assert_eq!(summary.free_shipping_remaining, None);
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1, false).is_ok());
        assert!(validate_quantity(0, false).is_err());
        assert!(validate_quantity(0, true).is_ok());
        assert!(validate_quantity(11, true).is_err());
        assert!(validate_quantity(-1, true).is_err());
    }

    #[test]
    fn test_merged_quantity_caps() {
        assert_eq!(merged_quantity(2, 3, 20), 5);
        assert_eq!(merged_quantity(8, 5, 20), MAX_QUANTITY_PER_LINE);
        assert_eq!(merged_quantity(1, 5, 4), 4);
    }

    #[test]
    fn test_add_to_cart_default_quantity() {
        let body: AddToCart = serde_json::from_str(r#"{"product_id": 7}"#).unwrap();
        assert_eq!(body.quantity, 1);
    }

    #[test]
    fn test_summary_serializes_flat_totals() {
        let json = serde_json::to_value(CartSummary::new(vec![line(100, 1)], &shop())).unwrap();
        assert_eq!(json["subtotal"], "100");
        assert_eq!(json["shipping_fee"], "49");
        assert_eq!(json["total"], "149");
    }
}
