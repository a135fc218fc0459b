//! Product catalog route handlers.
//!
//! Reads are public and served from the catalog cache. Writes require a
//! seller session and invalidate the cache.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::header::CACHE_CONTROL,
    response::IntoResponse,
};
use tracing::instrument;

use aquamart_core::ProductId;

use crate::cloudinary::{MAX_UPLOAD_BYTES, is_allowed_content_type};
use crate::db::RepositoryError;
use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppError, Result, add_breadcrumb};
use crate::middleware::RequireSeller;
use crate::models::product::{CategoryCount, StockUpdate};
use crate::models::{Page, Pagination, Product, ProductInput, ProductQuery};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Most files accepted in one upload request.
pub const MAX_FILES_PER_UPLOAD: usize = 5;

/// Multipart field carrying the image files.
const IMAGE_FIELD: &str = "images";

/// Browsers and CDNs may reuse public catalog reads briefly.
const PUBLIC_CACHE: [(axum::http::HeaderName, &str); 1] =
    [(CACHE_CONTROL, "public, max-age=60")];

fn catalog(state: &AppState) -> CatalogService<'_> {
    CatalogService::new(state.pool(), state.catalog_cache())
}

/// Filtered, sorted, paginated listing of active products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<impl IntoResponse> {
    query.validate()?;
    let pagination = Pagination::new(query.page, query.per_page)?;
    let page: Arc<Page<Product>> = catalog(&state).list(&query, pagination).await?;
    Ok((PUBLIC_CACHE, ApiResponse::ok(page)))
}

/// Distinct categories of active products with counts.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories: Arc<Vec<CategoryCount>> = catalog(&state).categories().await?;
    Ok((PUBLIC_CACHE, ApiResponse::ok(categories)))
}

/// One active product by slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse> {
    let product = catalog(&state)
        .get_by_slug(&slug)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
            other => other.into(),
        })?;
    Ok((PUBLIC_CACHE, ApiResponse::ok(product)))
}

/// Create a product.
#[instrument(skip(state, seller, input), fields(seller_id = %seller.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<ApiResponse<Product>> {
    input.validate()?;
    let product = catalog(&state).create(&input).await?;

    add_breadcrumb("catalog", "Product created", Some(&[("slug", product.slug.as_str())]));
    Ok(ApiResponse::ok(product).with_message("Product created"))
}

/// Replace a product's fields. The slug stays as it was.
#[instrument(skip(state, seller, input), fields(seller_id = %seller.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<ApiResponse<Product>> {
    input.validate()?;
    let product = catalog(&state).update(id, &input).await?;
    Ok(ApiResponse::ok(product).with_message("Product updated"))
}

/// Hide a product from the storefront. Orders keep their snapshots.
#[instrument(skip(state, seller), fields(seller_id = %seller.id))]
pub async fn deactivate(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<ApiResponse<()>> {
    catalog(&state).deactivate(id).await?;
    Ok(ApiResponse::message("Product removed"))
}

/// Set absolute stock.
#[instrument(skip(state, seller), fields(seller_id = %seller.id))]
pub async fn set_stock(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(update): ApiJson<StockUpdate>,
) -> Result<ApiResponse<Product>> {
    if update.stock < 0 {
        return Err(AppError::BadRequest("stock: cannot be negative".to_string()));
    }
    let product = catalog(&state).set_stock(id, update.stock).await?;
    Ok(ApiResponse::ok(product).with_message("Stock updated"))
}

/// Upload images from the `images` multipart field and append them.
#[instrument(skip(state, seller, multipart), fields(seller_id = %seller.id))]
pub async fn upload_images(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath(id): ApiPath<ProductId>,
    mut multipart: Multipart,
) -> Result<ApiResponse<Product>> {
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        if files.len() == MAX_FILES_PER_UPLOAD {
            return Err(AppError::BadRequest(format!(
                "At most {MAX_FILES_PER_UPLOAD} images per upload"
            )));
        }

        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let content_type = field.content_type().unwrap_or_default();
        if !is_allowed_content_type(content_type) {
            return Err(AppError::BadRequest(format!(
                "{file_name}: only JPEG, PNG and WebP images are accepted"
            )));
        }

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest(format!("{file_name} is empty")));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::BadRequest(format!(
                "{file_name} is larger than {} MB",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }
        files.push((file_name, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(AppError::BadRequest(format!(
            "No files in the `{IMAGE_FIELD}` field"
        )));
    }

    let count = files.len();
    let product = catalog(&state)
        .add_images(state.cloudinary(), id, files)
        .await?;

    tracing::info!(product_id = %id, count, "product images uploaded");
    Ok(ApiResponse::ok(product).with_message("Images uploaded"))
}

/// Remove an image and destroy the Cloudinary asset.
#[instrument(skip(state, seller), fields(seller_id = %seller.id))]
pub async fn delete_image(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath((id, public_id)): ApiPath<(ProductId, String)>,
) -> Result<ApiResponse<Product>> {
    let product = catalog(&state)
        .remove_image(state.cloudinary(), id, &public_id)
        .await?;
    Ok(ApiResponse::ok(product).with_message("Image removed"))
}
