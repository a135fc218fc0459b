//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AQUAMART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `AQUAMART_BASE_URL` - Public URL of the API
//! - `AQUAMART_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `RAZORPAY_KEY_ID` - Razorpay key id (public, sent to the checkout widget)
//! - `RAZORPAY_KEY_SECRET` - Razorpay key secret
//! - `CLOUDINARY_CLOUD_NAME` - Cloudinary cloud name
//! - `CLOUDINARY_API_KEY` - Cloudinary API key
//! - `CLOUDINARY_API_SECRET` - Cloudinary API secret
//! - `SHIPMOZO_PUBLIC_KEY` - `ShipMozo` public key
//! - `SHIPMOZO_PRIVATE_KEY` - `ShipMozo` private key
//!
//! ## Optional
//! - `AQUAMART_HOST` - Bind address (default: 127.0.0.1)
//! - `AQUAMART_PORT` - Listen port (default: 5000)
//! - `AQUAMART_FRONTEND_ORIGIN` - Origin of the React app for CORS (default: base URL)
//! - `RAZORPAY_WEBHOOK_SECRET` - Enables `/api/payments/webhook`
//! - `SHIPMOZO_WEBHOOK_TOKEN` - Shared token required on shipping webhooks
//! - `SHIPMOZO_WAREHOUSE_ID` - Pickup warehouse registered with `ShipMozo`
//! - `CLOUDINARY_FOLDER` - Upload folder (default: aquamart)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   transactional email; disabled when `SMTP_HOST` is unset
//! - `FREE_SHIPPING_THRESHOLD` - Subtotal from which shipping is free (default: 999)
//! - `SHIPPING_FEE` - Flat shipping fee below the threshold (default: 49)
//! - `COD_ENABLED` - Allow cash on delivery (default: true)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Origin allowed to call the API with credentials (the React app)
    pub frontend_origin: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Razorpay payment gateway
    pub razorpay: RazorpayConfig,
    /// Cloudinary image hosting
    pub cloudinary: CloudinaryConfig,
    /// `ShipMozo` courier aggregator
    pub shipmozo: ShipMozoConfig,
    /// SMTP settings, `None` disables email
    pub email: Option<EmailConfig>,
    /// Pricing rules applied at checkout
    pub shop: ShopConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Razorpay credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Key id, safe to expose to the browser checkout
    pub key_id: String,
    /// Key secret used for API basic auth and payment signatures
    pub key_secret: SecretString,
    /// Webhook signing secret (configured in the Razorpay dashboard)
    pub webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Cloudinary credentials.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (first path segment of the upload API)
    pub cloud_name: String,
    /// API key
    pub api_key: String,
    /// API secret used to sign uploads
    pub api_secret: SecretString,
    /// Folder that product images are uploaded into
    pub folder: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

/// `ShipMozo` credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShipMozoConfig {
    /// Public key header value
    pub public_key: String,
    /// Private key header value
    pub private_key: SecretString,
    /// Pickup warehouse id, when more than one is registered
    pub warehouse_id: Option<String>,
    /// Shared token expected on incoming webhooks
    pub webhook_token: Option<SecretString>,
}

impl std::fmt::Debug for ShipMozoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipMozoConfig")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .field("warehouse_id", &self.warehouse_id)
            .field(
                "webhook_token",
                &self.webhook_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// SMTP configuration for transactional email.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Checkout pricing rules.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Orders with a subtotal at or above this ship free
    pub free_shipping_threshold: Decimal,
    /// Flat fee charged below the threshold
    pub shipping_fee: Decimal,
    /// Whether cash on delivery is offered
    pub cod_enabled: bool,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::from(999),
            shipping_fee: Decimal::from(49),
            cod_enabled: true,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("AQUAMART_DATABASE_URL")?;
        let host = parse_env("AQUAMART_HOST", "127.0.0.1")?;
        let port = parse_env("AQUAMART_PORT", "5000")?;
        let base_url = get_required_env("AQUAMART_BASE_URL")?;
        let frontend_origin = get_optional_env("AQUAMART_FRONTEND_ORIGIN")
            .unwrap_or_else(|| base_url.trim_end_matches('/').to_owned());
        let session_secret = get_validated_secret("AQUAMART_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "AQUAMART_SESSION_SECRET")?;

        let razorpay = RazorpayConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;
        let shipmozo = ShipMozoConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let shop = ShopConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            frontend_origin,
            session_secret,
            razorpay,
            cloudinary,
            shipmozo,
            email,
            shop,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl RazorpayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            key_id: get_required_env("RAZORPAY_KEY_ID")?,
            key_secret: get_validated_secret("RAZORPAY_KEY_SECRET")?,
            webhook_secret: get_optional_validated_secret("RAZORPAY_WEBHOOK_SECRET")?,
        })
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_validated_secret("CLOUDINARY_API_SECRET")?,
            folder: get_env_or_default("CLOUDINARY_FOLDER", "aquamart"),
        })
    }
}

impl ShipMozoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            public_key: get_required_env("SHIPMOZO_PUBLIC_KEY")?,
            private_key: get_validated_secret("SHIPMOZO_PRIVATE_KEY")?,
            warehouse_id: get_optional_env("SHIPMOZO_WAREHOUSE_ID"),
            webhook_token: get_optional_validated_secret("SHIPMOZO_WEBHOOK_TOKEN")?,
        })
    }
}

impl EmailConfig {
    /// Email is optional: only configured when `SMTP_HOST` is set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

impl ShopConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let free_shipping_threshold = get_optional_env("FREE_SHIPPING_THRESHOLD")
            .map(|v| parse_value::<Decimal>("FREE_SHIPPING_THRESHOLD", &v))
            .transpose()?
            .unwrap_or(defaults.free_shipping_threshold);
        let shipping_fee = get_optional_env("SHIPPING_FEE")
            .map(|v| parse_value::<Decimal>("SHIPPING_FEE", &v))
            .transpose()?
            .unwrap_or(defaults.shipping_fee);
        let cod_enabled = parse_env("COD_ENABLED", "true")?;

        if free_shipping_threshold.is_sign_negative() || shipping_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "SHIPPING_FEE".to_string(),
                "shipping amounts cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            free_shipping_threshold,
            shipping_fee,
            cod_enabled,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Load and validate a secret that may be absent.
fn get_optional_validated_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    get_optional_env(key)
        .map(|value| {
            validate_secret_strength(&value, key)?;
            Ok(SecretString::from(value))
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-razorpay-secret", "RAZORPAY_KEY_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("AQUAMART_PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "AQUAMART_PORT"));
        assert_eq!(parse_value::<Decimal>("SHIPPING_FEE", " 49.50 ").unwrap(), Decimal::new(4950, 2));
    }

    #[test]
    fn test_shop_config_defaults() {
        let shop = ShopConfig::default();
        assert_eq!(shop.free_shipping_threshold, Decimal::from(999));
        assert_eq!(shop.shipping_fee, Decimal::from(49));
        assert!(shop.cod_enabled);
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let razorpay = RazorpayConfig {
            key_id: "rzp_test_visible".to_string(),
            key_secret: SecretString::from("hidden_key_secret_value"),
            webhook_secret: Some(SecretString::from("hidden_webhook_value")),
        };
        let shipmozo = ShipMozoConfig {
            public_key: "pub_visible".to_string(),
            private_key: SecretString::from("hidden_private_value"),
            warehouse_id: None,
            webhook_token: None,
        };

        let debug_output = format!("{razorpay:?} {shipmozo:?}");
        assert!(debug_output.contains("rzp_test_visible"));
        assert!(debug_output.contains("pub_visible"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hidden_key_secret_value"));
        assert!(!debug_output.contains("hidden_webhook_value"));
        assert!(!debug_output.contains("hidden_private_value"));
    }
}
