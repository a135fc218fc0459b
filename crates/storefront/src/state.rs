//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cloudinary::CloudinaryClient;
use crate::config::StorefrontConfig;
use crate::razorpay::RazorpayClient;
use crate::services::catalog::CatalogCache;
use crate::services::email::EmailService;
use crate::services::notifier::NotificationHub;
use crate::shipmozo::{ShipMozoClient, ShipMozoError};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("ShipMozo client: {0}")]
    ShipMozo(#[from] ShipMozoError),
    #[error("SMTP transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections, API clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    razorpay: RazorpayClient,
    cloudinary: CloudinaryClient,
    shipmozo: ShipMozoClient,
    email: Option<EmailService>,
    notifications: NotificationHub,
    catalog_cache: CatalogCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Email is disabled when SMTP is not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the `ShipMozo` keys or SMTP relay are unusable.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let razorpay = RazorpayClient::new(&config.razorpay);
        let cloudinary = CloudinaryClient::new(&config.cloudinary);
        let shipmozo = ShipMozoClient::new(&config.shipmozo)?;
        let email = match &config.email {
            Some(email_config) => Some(EmailService::new(email_config, &config.frontend_origin)?),
            None => {
                tracing::warn!("SMTP_HOST not set, transactional email disabled");
                None
            }
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                razorpay,
                cloudinary,
                shipmozo,
                email,
                notifications: NotificationHub::default(),
                catalog_cache: CatalogCache::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    #[must_use]
    pub fn cloudinary(&self) -> &CloudinaryClient {
        &self.inner.cloudinary
    }

    #[must_use]
    pub fn shipmozo(&self) -> &ShipMozoClient {
        &self.inner.shipmozo
    }

    /// Email sender, `None` when SMTP is not configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Live notification fan-out.
    #[must_use]
    pub fn notifications(&self) -> &NotificationHub {
        &self.inner.notifications
    }

    #[must_use]
    pub fn catalog_cache(&self) -> &CatalogCache {
        &self.inner.catalog_cache
    }
}
