//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use atelier_core::pricing::PricingEngine;

use crate::config::StorefrontConfig;
use crate::services::coupons::CouponCache;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    pricing: PricingEngine,
    coupon_cache: CouponCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The pricing engine takes its fees and thresholds from `config.pricing`.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let pricing = PricingEngine::new(config.pricing);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                pricing,
                coupon_cache: CouponCache::new(),
            }),
        }
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

    /// Get the checkout pricing engine.
    #[must_use]
    pub fn pricing(&self) -> &PricingEngine {
        &self.inner.pricing
    }

    /// Get the public active-coupon cache.
    #[must_use]
    pub fn coupon_cache(&self) -> &CouponCache {
        &self.inner.coupon_cache
    }
}
