//! Catalog reads with an in-memory cache, and seller writes that invalidate it.
//!
//! Product pages, listing pages and the category list are cached in `moka`
//! for 5 minutes. Any seller write clears the whole cache: listings depend on
//! price, stock and activity, so targeted invalidation buys little.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::instrument;

use aquamart_core::ProductId;

use crate::cloudinary::{CloudinaryClient, CloudinaryError, UploadedImage};
use crate::db::{ProductRepository, RepositoryError};
use crate::models::product::{CategoryCount, MAX_IMAGES_PER_PRODUCT};
use crate::models::{Page, Pagination, Product, ProductImage, ProductInput, ProductQuery};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(String),
    Listing(ProductQuery),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Arc<Product>),
    Listing(Arc<Page<Product>>),
    Categories(Arc<Vec<CategoryCount>>),
}

/// Shared catalog cache, cloned into every request.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogCache {
    /// Create a cache with the default 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(300))
    }

    /// Create a cache with a custom TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Number of live entries (after pending maintenance).
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from image management.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Cloudinary(#[from] CloudinaryError),

    #[error("a product can have at most {max} images")]
    TooMany { max: usize },
}

/// Catalog operations.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    cache: &'a CatalogCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            products: ProductRepository::new(pool),
            cache,
        }
    }

    /// One page of active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ProductQuery,
        pagination: Pagination,
    ) -> Result<Arc<Page<Product>>, RepositoryError> {
        let key = CacheKey::Listing(ProductQuery {
            page: Some(pagination.page),
            per_page: Some(pagination.per_page),
            ..query.clone()
        });
        if let Some(CacheValue::Listing(page)) = self.cache.cache.get(&key).await {
            tracing::debug!("catalog listing cache hit");
            return Ok(page);
        }

        let (items, total) = self.products.list(query, pagination).await?;
        let page = Arc::new(Page::new(items, pagination, total));
        self.cache
            .cache
            .insert(key, CacheValue::Listing(Arc::clone(&page)))
            .await;
        Ok(page)
    }

    /// An active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such active product.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Arc<Product>, RepositoryError> {
        let key = CacheKey::Product(slug.to_owned());
        if let Some(CacheValue::Product(product)) = self.cache.cache.get(&key).await {
            return Ok(product);
        }

        let product = Arc::new(
            self.products
                .get_active_by_slug(slug)
                .await?
                .ok_or(RepositoryError::NotFound)?,
        );
        self.cache
            .cache
            .insert(key, CacheValue::Product(Arc::clone(&product)))
            .await;
        Ok(product)
    }

    /// Categories of active products with counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Arc<Vec<CategoryCount>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.cache.get(&CacheKey::Categories).await
        {
            return Ok(categories);
        }

        let categories = Arc::new(self.products.categories().await?);
        self.cache
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Any product by ID (seller view, uncached).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it doesn't exist.
    pub async fn get(&self, id: ProductId) -> Result<Product, RepositoryError> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a slug race.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let product = self.products.create(input).await?;
        self.cache.invalidate_all().await;
        tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
        Ok(product)
    }

    /// Update a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it doesn't exist.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let product = self.products.update(id, input).await?;
        self.cache.invalidate_all().await;
        Ok(product)
    }

    /// Hide a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it doesn't exist.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: ProductId) -> Result<(), RepositoryError> {
        if !self.products.deactivate(id).await? {
            return Err(RepositoryError::NotFound);
        }
        self.cache.invalidate_all().await;
        Ok(())
    }

    /// Set absolute stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it doesn't exist.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, stock: i32) -> Result<Product, RepositoryError> {
        let product = self.products.set_stock(id, stock).await?;
        self.cache.invalidate_all().await;
        Ok(product)
    }

    /// Upload images to Cloudinary and append them to the product.
    ///
    /// Uploaded assets are destroyed again if the product update fails.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::TooMany` when the product would exceed the image limit.
    #[instrument(skip(self, cloudinary, files), fields(count = files.len()))]
    pub async fn add_images(
        &self,
        cloudinary: &CloudinaryClient,
        id: ProductId,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<Product, ImageError> {
        let product = self.get(id).await?;
        if product.images.len() + files.len() > MAX_IMAGES_PER_PRODUCT {
            return Err(ImageError::TooMany {
                max: MAX_IMAGES_PER_PRODUCT,
            });
        }

        let mut uploaded: Vec<UploadedImage> = Vec::with_capacity(files.len());
        for (file_name, bytes) in files {
            match cloudinary.upload(&file_name, bytes).await {
                Ok(image) => uploaded.push(image),
                Err(e) => {
                    discard(cloudinary, &uploaded).await;
                    return Err(e.into());
                }
            }
        }

        let images: Vec<ProductImage> = uploaded
            .iter()
            .map(|u| ProductImage {
                url: u.secure_url.clone(),
                public_id: u.public_id.clone(),
            })
            .collect();

        match self.products.append_images(id, &images).await {
            Ok(product) => {
                self.cache.invalidate_all().await;
                Ok(product)
            }
            Err(e) => {
                discard(cloudinary, &uploaded).await;
                Err(e.into())
            }
        }
    }

    /// Remove an image from the product and destroy the asset.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or image doesn't exist.
    #[instrument(skip(self, cloudinary))]
    pub async fn remove_image(
        &self,
        cloudinary: &CloudinaryClient,
        id: ProductId,
        public_id: &str,
    ) -> Result<Product, ImageError> {
        let product = self.get(id).await?;
        if !product.images.iter().any(|i| i.public_id == public_id) {
            return Err(RepositoryError::NotFound.into());
        }

        let product = self.products.remove_image(id, public_id).await?;
        self.cache.invalidate_all().await;

        if let Err(e) = cloudinary.destroy(public_id).await {
            tracing::warn!(public_id, error = %e, "failed to destroy Cloudinary asset");
        }
        Ok(product)
    }
}

async fn discard(cloudinary: &CloudinaryClient, uploaded: &[UploadedImage]) {
    for image in uploaded {
        if let Err(e) = cloudinary.destroy(&image.public_id).await {
            tracing::warn!(public_id = %image.public_id, error = %e, "failed to clean up upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_all_empties_cache() {
        let cache = CatalogCache::new();
        cache
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::new(vec![CategoryCount {
                    category: "purifiers".to_string(),
                    count: 3,
                }])),
            )
            .await;
        assert_eq!(cache.entry_count().await, 1);

        cache.invalidate_all().await;
        assert_eq!(cache.entry_count().await, 0);
    }

    #[test]
    fn test_listing_keys_differ_by_page() {
        let query = ProductQuery::default();
        let a = CacheKey::Listing(ProductQuery {
            page: Some(1),
            ..query.clone()
        });
        let b = CacheKey::Listing(ProductQuery {
            page: Some(2),
            ..query
        });
        assert_ne!(a, b);
    }
}
