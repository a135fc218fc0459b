//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: AquaPure RO+UV 8L
//!     category: purifiers
//!     brand: AquaPure
//!     price: "12499"
//!     mrp: "15999"
//!     stock: 12
//!     specifications:
//!       capacity: 8 L
//!     images:
//!       - url: https://res.cloudinary.com/aquamart/image/upload/v1/products/ro-uv.jpg
//!         public_id: products/ro-uv
//! ```
//!
//! Products are matched by the slug derived from their name, so running the
//! same file twice updates rather than duplicates. With `--clear`, every
//! product is hidden first and only those in the file come back.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use aquamart_storefront::db::{self, ProductRepository, RepositoryError};
use aquamart_storefront::models::product::{MAX_IMAGES_PER_PRODUCT, slugify};
use aquamart_storefront::models::{ProductImage, ProductInput};

use super::database_url;

/// Top-level layout of the catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry: the API's product body plus already-hosted images.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(flatten)]
    pub product: ProductInput,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

/// What a seeding run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: usize,
    pub updated: usize,
    pub deactivated: u64,
}

/// Parse a catalog file.
///
/// # Errors
///
/// Returns the YAML error if the document doesn't match the layout.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Check every entry, returning one message per problem.
#[must_use]
pub fn validate_catalog(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut slugs = HashSet::new();

    if catalog.products.is_empty() {
        errors.push("catalog has no products".to_string());
    }

    for (index, entry) in catalog.products.iter().enumerate() {
        let label = format!("products[{index}] ({})", entry.product.name);

        if let Err(e) = entry.product.validate() {
            errors.push(format!("{label}: {e}"));
        }
        if !slugs.insert(slugify(&entry.product.name)) {
            errors.push(format!("{label}: duplicate product name"));
        }
        if entry.images.len() > MAX_IMAGES_PER_PRODUCT {
            errors.push(format!(
                "{label}: at most {MAX_IMAGES_PER_PRODUCT} images allowed"
            ));
        }
        for image in &entry.images {
            if !image.url.starts_with("https://") {
                errors.push(format!("{label}: image url must be https: {}", image.url));
            }
            if image.public_id.trim().is_empty() {
                errors.push(format!("{label}: image public_id is empty"));
            }
        }
    }

    errors
}

/// Seed the catalog from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the catalog YAML file
/// * `clear_existing` - If true, deactivate all products first
///
/// # Errors
///
/// Returns an error if the file can't be read or parsed, any entry fails
/// validation, or a database operation fails.
pub async fn catalog(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let catalog = parse_catalog(&content)?;

    info!(products = catalog.products.len(), "Parsed catalog");

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let summary = seed(&ProductRepository::new(&pool), &catalog, clear_existing).await?;

    info!(
        created = summary.created,
        updated = summary.updated,
        deactivated = summary.deactivated,
        "Catalog seeding complete"
    );
    Ok(())
}

async fn seed(
    products: &ProductRepository<'_>,
    catalog: &CatalogFile,
    clear_existing: bool,
) -> Result<SeedSummary, RepositoryError> {
    let mut summary = SeedSummary::default();

    if clear_existing {
        summary.deactivated = products.deactivate_all().await?;
        info!(count = summary.deactivated, "Deactivated existing products");
    }

    for entry in &catalog.products {
        let slug = slugify(&entry.product.name);
        let product = match products.get_by_slug(&slug).await? {
            Some(existing) => {
                summary.updated += 1;
                products.update(existing.id, &entry.product).await?
            }
            None => {
                summary.created += 1;
                products.create(&entry.product).await?
            }
        };

        if !entry.images.is_empty() {
            products.replace_images(product.id, &entry.images).await?;
        }
        info!(slug = %product.slug, stock = product.stock, "Seeded product");
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    const CATALOG: &str = r#"
products:
  - name: AquaPure RO+UV 8L
    category: Purifiers
    brand: AquaPure
    price: "12499"
    mrp: "15999"
    stock: 12
    specifications:
      capacity: 8 L
      stages: "7"
    images:
      - url: https://res.cloudinary.com/aquamart/image/upload/v1/products/ro-uv.jpg
        public_id: products/ro-uv
  - name: Sediment Filter Cartridge
    category: spares
    price: 349
"#;

    #[test]
    fn parses_products_with_images_and_defaults() {
        let catalog = parse_catalog(CATALOG).unwrap();
        assert_eq!(catalog.products.len(), 2);

        let purifier = &catalog.products[0];
        assert_eq!(purifier.product.price, Decimal::from(12499));
        assert_eq!(purifier.product.mrp, Some(Decimal::from(15999)));
        assert_eq!(purifier.product.specifications["stages"], "7");
        assert_eq!(purifier.images[0].public_id, "products/ro-uv");

        let cartridge = &catalog.products[1];
        assert_eq!(cartridge.product.stock, 0);
        assert!(cartridge.product.is_active);
        assert!(cartridge.images.is_empty());
        assert_eq!(cartridge.product.effective_mrp(), Decimal::from(349));
    }

    #[test]
    fn valid_catalog_has_no_errors() {
        let catalog = parse_catalog(CATALOG).unwrap();
        assert!(validate_catalog(&catalog).is_empty());
    }

    #[test]
    fn reports_every_problem() {
        let catalog = parse_catalog(
            r#"
products:
  - name: Softener
    category: softeners
    price: "0"
  - name: Filter Jug
    category: jugs
    price: "499"
    images:
      - url: http://example.com/jug.jpg
        public_id: jug
  - name: Filter-Jug
    category: jugs
    price: "499"
"#,
        )
        .unwrap();

        let errors = validate_catalog(&catalog);
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].contains("price"));
        assert!(errors[1].contains("https"));
        assert!(errors[2].contains("duplicate"));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let catalog = parse_catalog("products: []").unwrap();
        assert_eq!(validate_catalog(&catalog), vec!["catalog has no products"]);
    }

    #[test]
    fn missing_required_field_fails_to_parse() {
        assert!(parse_catalog("products:\n  - name: No Price\n    category: misc\n").is_err());
    }
}
