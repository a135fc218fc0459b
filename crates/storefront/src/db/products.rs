//! Product catalog repository.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use aquamart_core::ProductId;

use super::RepositoryError;
use crate::models::product::CategoryCount;
use crate::models::{Pagination, Product, ProductImage, ProductInput, ProductQuery};

const PRODUCT_COLUMNS: &str = "id, name, slug, description, category, brand, price, mrp, stock, \
                               images, specifications, is_active, created_at, updated_at";

/// Repository for catalog operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active products matching the query, with the unpaginated total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        query: &ProductQuery,
        pagination: Pagination,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filters(&mut select, query);
        select.push(" ORDER BY ").push(query.sort.order_by());
        select.push(" LIMIT ").push_bind(pagination.limit());
        select.push(" OFFSET ").push_bind(pagination.offset());

        let products = select.build_query_as::<Product>().fetch_all(self.pool).await?;
        Ok((products, total))
    }

    /// Get an active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1 AND is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Get any product (active or not) by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Get any product (active or not) by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Distinct categories of active products with their counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<CategoryCount>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategoryCount>(
            "SELECT category, COUNT(*) AS count FROM products
             WHERE is_active
             GROUP BY category
             ORDER BY category",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Create a product, deriving a unique slug from its name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a concurrent insert took the slug.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let slug = self.unique_slug(&crate::models::product::slugify(&input.name)).await?;

        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products
                (name, slug, description, category, brand, price, mrp, stock, specifications, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(&slug)
        .bind(input.description.trim())
        .bind(input.category.trim().to_lowercase())
        .bind(input.brand())
        .bind(input.price)
        .bind(input.effective_mrp())
        .bind(input.stock)
        .bind(Json(&input.specifications))
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "a product with this slug already exists"))
    }

    /// Replace a product's editable fields. The slug is kept so links stay valid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET
                name = $2, description = $3, category = $4, brand = $5, price = $6, mrp = $7,
                stock = $8, specifications = $9, is_active = $10, updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(input.description.trim())
        .bind(input.category.trim().to_lowercase())
        .bind(input.brand())
        .bind(input.price)
        .bind(input.effective_mrp())
        .bind(input.stock)
        .bind(Json(&input.specifications))
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Soft delete: hide the product from the catalog.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn deactivate(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET is_active = FALSE, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hide every product (used before re-seeding the catalog).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn deactivate_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE products SET is_active = FALSE, updated_at = now() WHERE is_active")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Set absolute stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_stock(&self, id: ProductId, stock: i32) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET stock = $2, updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(stock)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Append uploaded images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn append_images(
        &self,
        id: ProductId,
        images: &[ProductImage],
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET images = images || $2::jsonb, updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(images))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Replace the whole image list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn replace_images(
        &self,
        id: ProductId,
        images: &[ProductImage],
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET images = $2, updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(images))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Remove one image by its Cloudinary public id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn remove_image(
        &self,
        id: ProductId,
        public_id: &str,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET
                images = COALESCE(
                    (SELECT jsonb_agg(img ORDER BY pos)
                     FROM jsonb_array_elements(images) WITH ORDINALITY AS t(img, pos)
                     WHERE img->>'public_id' <> $2),
                    '[]'::jsonb),
                updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(public_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Products at or below a stock level, most urgent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(
        &self,
        threshold: i32,
    ) -> Result<Vec<crate::models::dashboard::LowStockProduct>, RepositoryError> {
        let products = sqlx::query_as(
            "SELECT id, name, slug, stock FROM products
             WHERE is_active AND stock <= $1
             ORDER BY stock ASC, name ASC
             LIMIT 20",
        )
        .bind(threshold)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// First free slug for `base`: `base`, `base-2`, `base-3`, ...
    async fn unique_slug(&self, base: &str) -> Result<String, RepositoryError> {
        let taken: Vec<String> =
            sqlx::query_scalar("SELECT slug FROM products WHERE slug = $1 OR slug LIKE $1 || '-%'")
                .bind(base)
                .fetch_all(self.pool)
                .await?;
        Ok(next_free_slug(base, &taken))
    }
}

/// Append the `WHERE` clause for a catalog query.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE is_active");

    if let Some(category) = query.category() {
        builder
            .push(" AND category = ")
            .push_bind(category.to_lowercase());
    }
    if let Some(term) = query.search() {
        let pattern = format!("%{}%", escape_like(term));
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR COALESCE(brand, '') ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = query.min_price {
        builder.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        builder.push(" AND price <= ").push_bind(max);
    }
    if query.in_stock {
        builder.push(" AND stock > 0");
    }
}

/// Escape `LIKE` wildcards in user input.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Pick the first slug not in `taken`.
fn next_free_slug(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_owned();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.iter().any(|s| s == candidate))
        .unwrap_or_else(|| base.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_free_slug() {
        assert_eq!(next_free_slug("ro-filter", &[]), "ro-filter");
        assert_eq!(
            next_free_slug("ro-filter", &["ro-filter".to_string()]),
            "ro-filter-2"
        );
        assert_eq!(
            next_free_slug(
                "ro-filter",
                &[
                    "ro-filter".to_string(),
                    "ro-filter-2".to_string(),
                    "ro-filter-kit".to_string()
                ]
            ),
            "ro-filter-3"
        );
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_pure"), "100\\%\\_pure");
        assert_eq!(escape_like("ro uv"), "ro uv");
    }

    #[test]
    fn test_filters_sql() {
        let query = ProductQuery {
            category: Some("Purifiers".to_string()),
            q: Some("uv".to_string()),
            in_stock: true,
            ..ProductQuery::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut builder, &query);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM products WHERE is_active AND category = $1 \
             AND (name ILIKE $2 OR description ILIKE $3 OR COALESCE(brand, '') ILIKE $4) \
             AND stock > 0"
        );
    }
}
