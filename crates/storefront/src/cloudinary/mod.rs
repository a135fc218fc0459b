//! Cloudinary image hosting for product photos.
//!
//! Uploads and deletions are signed server-side: the signature is the hex
//! SHA-256 of the alphabetically sorted `key=value` parameters joined with
//! `&`, followed by the API secret. The product environment must be set to
//! SHA-256 signatures.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CloudinaryConfig;

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Image types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Errors that can occur when interacting with Cloudinary.
#[derive(Debug, Error)]
pub enum CloudinaryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Cloudinary returned an error.
    #[error("Cloudinary API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMessage {
    message: String,
}

/// A successfully uploaded asset.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    pub public_id: String,
    pub secure_url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary upload API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    inner: Arc<CloudinaryClientInner>,
}

struct CloudinaryClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl std::fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("base_url", &self.inner.base_url)
            .field("api_key", &self.inner.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.inner.folder)
            .finish_non_exhaustive()
    }
}

impl CloudinaryClient {
    /// Create a new Cloudinary client.
    #[must_use]
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            inner: Arc::new(CloudinaryClientInner {
                client: reqwest::Client::new(),
                base_url: format!("{CLOUDINARY_API_BASE}/{}", config.cloud_name),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                folder: config.folder.clone(),
            }),
        }
    }

    /// Upload one image into the configured folder.
    ///
    /// # Errors
    ///
    /// Returns `CloudinaryError::Api` if Cloudinary rejects the upload.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage, CloudinaryError> {
        let timestamp = unix_timestamp();
        let params = [
            ("folder", self.inner.folder.as_str()),
            ("timestamp", timestamp.as_str()),
        ];
        let signature = sign_params(&params, self.inner.api_secret.expose_secret());

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_owned()))
            .text("api_key", self.inner.api_key.clone())
            .text("folder", self.inner.folder.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .inner
            .client
            .post(format!("{}/image/upload", self.inner.base_url))
            .multipart(form)
            .send()
            .await?;

        let image: UploadedImage = parse_response(response).await?;
        debug!(public_id = %image.public_id, "image uploaded");
        Ok(image)
    }

    /// Delete an asset. A missing asset is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CloudinaryError::Api` if Cloudinary rejects the request.
    #[instrument(skip(self))]
    pub async fn destroy(&self, public_id: &str) -> Result<(), CloudinaryError> {
        let timestamp = unix_timestamp();
        let params = [("public_id", public_id), ("timestamp", timestamp.as_str())];
        let signature = sign_params(&params, self.inner.api_secret.expose_secret());

        let response = self
            .inner
            .client
            .post(format!("{}/image/destroy", self.inner.base_url))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.inner.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        let result: DestroyResponse = parse_response(response).await?;
        match result.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(CloudinaryError::Api {
                status: 200,
                message: other.to_owned(),
            }),
        }
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CloudinaryError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.chars().take(200).collect());
        return Err(CloudinaryError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| CloudinaryError::Parse(e.to_string()))
}

fn unix_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Sign request parameters.
#[must_use]
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by_key(|(k, _)| *k);

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether a content type may be uploaded.
#[must_use]
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    ALLOWED_CONTENT_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(essence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_params_sorts_and_skips_empty() {
        let secret = "abcd";
        let a = sign_params(&[("timestamp", "1315060510"), ("folder", "aquamart")], secret);
        let b = sign_params(
            &[("folder", "aquamart"), ("eager", ""), ("timestamp", "1315060510")],
            secret,
        );
        assert_eq!(a, b);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=aquamart&timestamp=1315060510abcd");
        assert_eq!(a, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_allowed_content_types() {
        assert!(is_allowed_content_type("image/jpeg"));
        assert!(is_allowed_content_type("image/PNG"));
        assert!(is_allowed_content_type("image/webp; charset=binary"));
        assert!(!is_allowed_content_type("image/gif"));
        assert!(!is_allowed_content_type("application/pdf"));
    }

    #[test]
    fn test_upload_response_parsing() {
        let json = r#"{
            "asset_id": "b5e6d2b39ba3e0869d67141ba7dba6cf",
            "public_id": "aquamart/ro-uv-purifier_x1y2z3",
            "width": 1200,
            "height": 1200,
            "format": "jpg",
            "bytes": 245113,
            "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/aquamart/ro-uv-purifier_x1y2z3.jpg"
        }"#;
        let image: UploadedImage = serde_json::from_str(json).expect("deserialize");
        assert_eq!(image.public_id, "aquamart/ro-uv-purifier_x1y2z3");
        assert_eq!(image.width, Some(1200));
    }
}
