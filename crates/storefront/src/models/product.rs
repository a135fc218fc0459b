//! Catalog products.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aquamart_core::ProductId;

use super::{ValidationError, check_length};

/// Maximum number of images on a product.
pub const MAX_IMAGES_PER_PRODUCT: usize = 8;

/// A product image hosted on Cloudinary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    /// Delivery URL (HTTPS).
    pub url: String,
    /// Cloudinary public id, needed to delete the asset.
    pub public_id: String,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub brand: Option<String>,
    pub price: Decimal,
    pub mrp: Decimal,
    pub stock: i32,
    #[sqlx(json)]
    pub images: Vec<ProductImage>,
    #[sqlx(json)]
    pub specifications: BTreeMap<String, String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// First image URL, used as the thumbnail.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(|i| i.url.as_str())
    }

    /// Whether the product can be bought right now.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.is_active && self.stock > 0
    }

    /// Whole-number discount off MRP, 0 when there is none.
    #[must_use]
    pub fn discount_percent(&self) -> u32 {
        use rust_decimal::prelude::ToPrimitive;

        if self.mrp <= self.price || self.mrp.is_zero() {
            return 0;
        }
        ((self.mrp - self.price) * Decimal::from(100) / self.mrp)
            .floor()
            .to_u32()
            .unwrap_or(0)
    }
}

/// Request body for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub price: Decimal,
    /// Defaults to `price` when omitted.
    #[serde(default)]
    pub mrp: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

impl ProductInput {
    /// Validate field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first field that violates its constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_length("name", &self.name, 3, 120)?;
        check_length("description", &self.description, 0, 5000)?;
        check_length("category", &self.category, 1, 50)?;
        if let Some(brand) = &self.brand {
            check_length("brand", brand, 0, 60)?;
        }
        if self.price <= Decimal::ZERO {
            return Err(ValidationError::new("price", "must be greater than 0"));
        }
        if self.price.scale() > 2 {
            return Err(ValidationError::new("price", "must have at most 2 decimal places"));
        }
        if let Some(mrp) = self.mrp {
            if mrp < self.price {
                return Err(ValidationError::new("mrp", "cannot be less than price"));
            }
            if mrp.scale() > 2 {
                return Err(ValidationError::new("mrp", "must have at most 2 decimal places"));
            }
        }
        if self.stock < 0 {
            return Err(ValidationError::new("stock", "cannot be negative"));
        }
        if self.specifications.len() > 50 {
            return Err(ValidationError::new("specifications", "at most 50 entries"));
        }
        for (key, value) in &self.specifications {
            check_length("specifications", key, 1, 60)?;
            check_length("specifications", value, 0, 200)?;
        }
        Ok(())
    }

    /// MRP, falling back to price.
    #[must_use]
    pub fn effective_mrp(&self) -> Decimal {
        self.mrp.unwrap_or(self.price)
    }

    /// Brand with blank values treated as absent.
    #[must_use]
    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref().map(str::trim).filter(|b| !b.is_empty())
    }
}

/// Request body for a stock adjustment.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StockUpdate {
    pub stock: i32,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// SQL `ORDER BY` clause. Always ends with `id` so paging is stable.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::PriceAsc => "price ASC, id ASC",
            Self::PriceDesc => "price DESC, id DESC",
            Self::Name => "lower(name) ASC, id ASC",
        }
    }
}

/// Query parameters for `GET /api/products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ProductQuery {
    /// Trimmed search term, `None` when blank.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Trimmed category filter, `None` when blank.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Validate the price range.
    ///
    /// # Errors
    ///
    /// Returns an error when a bound is negative or the range is inverted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_price.is_some_and(|p| p.is_sign_negative())
            || self.max_price.is_some_and(|p| p.is_sign_negative())
        {
            return Err(ValidationError::new("min_price", "prices cannot be negative"));
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(ValidationError::new("min_price", "cannot exceed max_price"));
        }
        Ok(())
    }
}

/// Number of active products in a category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Derive a URL slug from a product name.
///
/// Lowercases ASCII letters and digits, collapses everything else into single
/// hyphens and trims hyphens from both ends.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        "product".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn input() -> ProductInput {
        serde_json::from_value(serde_json::json!({
            "name": "AquaPure RO+UV 8L",
            "category": "purifiers",
            "price": "12499",
            "mrp": "15999",
            "stock": 12,
            "specifications": {"Capacity": "8 L", "Stages": "7"}
        }))
        .unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("AquaPure RO+UV 8L"), "aquapure-ro-uv-8l");
        assert_eq!(slugify("  --Filter (Pack of 3)--  "), "filter-pack-of-3");
        assert_eq!(slugify("जल"), "product");
    }

    #[test]
    fn test_input_defaults() {
        let input = input();
        assert!(input.is_active);
        assert_eq!(input.description, "");
        assert!(input.validate().is_ok());

        let minimal: ProductInput = serde_json::from_value(serde_json::json!({
            "name": "Sediment filter",
            "category": "spares",
            "price": 299
        }))
        .unwrap();
        assert_eq!(minimal.effective_mrp(), Decimal::from(299));
        assert_eq!(minimal.stock, 0);
    }

    #[test]
    fn test_input_validation() {
        let mut bad = input();
        bad.mrp = Some(Decimal::from(100));
        assert_eq!(bad.validate().unwrap_err().field, "mrp");

        let mut bad = input();
        bad.price = Decimal::ZERO;
        assert_eq!(bad.validate().unwrap_err().field, "price");

        let mut bad = input();
        bad.name = "RO".to_string();
        assert_eq!(bad.validate().unwrap_err().field, "name");

        let mut bad = input();
        bad.stock = -1;
        assert_eq!(bad.validate().unwrap_err().field, "stock");

        let mut bad = input();
        bad.price = Decimal::from_str("10.999").unwrap();
        bad.mrp = None;
        assert_eq!(bad.validate().unwrap_err().field, "price");
    }

    #[test]
    fn test_query_validation() {
        let query = ProductQuery {
            min_price: Some(Decimal::from(500)),
            max_price: Some(Decimal::from(100)),
            ..ProductQuery::default()
        };
        assert!(query.validate().is_err());
        assert!(ProductQuery::default().validate().is_ok());
    }

    #[test]
    fn test_query_blank_filters_ignored() {
        let query = ProductQuery {
            q: Some("   ".to_string()),
            category: Some(" purifiers ".to_string()),
            ..ProductQuery::default()
        };
        assert_eq!(query.search(), None);
        assert_eq!(query.category(), Some("purifiers"));
    }

    #[test]
    fn test_sort_parses_from_query_value() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap();
        assert_eq!(sort, ProductSort::PriceDesc);
        assert_eq!(ProductSort::default().order_by(), "created_at DESC, id DESC");
    }
}
