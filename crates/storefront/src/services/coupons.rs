//! Coupon resolution, previews and admin maintenance.
//!
//! The public active list is cached for 60 seconds; every admin write drops
//! the cache so the next read reloads it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, instrument};

use atelier_core::coupon::{
    AppliedCoupon, Coupon, CouponCode, CouponDraft, CouponRejection, DiscountType, evaluate,
};
use atelier_core::{CouponId, Money, UserId};

use crate::db::{CouponRepository, FollowRepository, RepositoryError};
use crate::error::AppError;

const ACTIVE_LIST_TTL: Duration = Duration::from_secs(60);

/// Cache of the public active-coupon list.
#[derive(Clone)]
pub struct CouponCache {
    cache: Cache<(), Arc<Vec<Coupon>>>,
}

impl Default for CouponCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CouponCache {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(ACTIVE_LIST_TTL)
            .build();
        Self { cache }
    }

    async fn get(&self) -> Option<Arc<Vec<Coupon>>> {
        self.cache.get(&()).await
    }

    async fn insert(&self, coupons: Arc<Vec<Coupon>>) {
        self.cache.insert((), coupons).await;
    }

    /// Drop the cached list.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

/// Preview of a coupon applied to a subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponPreview {
    pub code: CouponCode,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub discount: Money,
    /// Subtotal after the discount.
    pub final_amount: Money,
}

/// Body of `POST /coupons/validate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal: Money,
}

/// Coupon service.
pub struct CouponService<'a> {
    coupons: CouponRepository<'a>,
    follows: FollowRepository<'a>,
    cache: &'a CouponCache,
}

impl<'a> CouponService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CouponCache) -> Self {
        Self {
            coupons: CouponRepository::new(pool),
            follows: FollowRepository::new(pool),
            cache,
        }
    }

    /// Publicly advertised coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the list has to be loaded and the query fails.
    pub async fn active(&self) -> Result<Arc<Vec<Coupon>>, AppError> {
        if let Some(coupons) = self.cache.get().await {
            debug!("Cache hit for active coupons");
            return Ok(coupons);
        }

        let coupons = Arc::new(self.coupons.list_public(Utc::now()).await?);
        self.cache.insert(Arc::clone(&coupons)).await;
        Ok(coupons)
    }

    /// Run every redemption rule for `code` against `subtotal`.
    ///
    /// Follow edges are only loaded for special coupons with a signed-in
    /// caller. A code that cannot be parsed is treated as unknown.
    ///
    /// # Errors
    ///
    /// Returns the `CouponRejection` that refused the coupon, or
    /// `AppError::Database` if a lookup fails.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn resolve(
        &self,
        code: &str,
        subtotal: Money,
        user: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<AppliedCoupon, AppError> {
        let Ok(code) = CouponCode::parse(code) else {
            return Err(CouponRejection::NotFound.into());
        };
        let coupon = self.coupons.find_by_code(&code).await?;

        let redeemer = match (&coupon, user) {
            (Some(coupon), Some(user_id)) if coupon.special => {
                Some(self.follows.redeemer(user_id).await?)
            }
            _ => None,
        };

        Ok(evaluate(coupon.as_ref(), subtotal, redeemer.as_ref(), now)?)
    }

    /// Check a coupon without placing an order.
    ///
    /// A successful check of a special coupon bumps its special-use counter.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a negative subtotal, otherwise as
    /// [`Self::resolve`].
    pub async fn preview(
        &self,
        request: &ValidateCouponRequest,
        user: Option<UserId>,
    ) -> Result<CouponPreview, AppError> {
        if request.subtotal.is_negative() {
            return Err(AppError::BadRequest(
                "Subtotal cannot be negative".to_string(),
            ));
        }

        let applied = self
            .resolve(&request.code, request.subtotal, user, Utc::now())
            .await?;

        if applied.special {
            self.coupons.record_special_use(applied.coupon_id).await?;
        }

        let coupon = self
            .coupons
            .get(applied.coupon_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(CouponPreview {
            final_amount: request.subtotal.saturating_sub(applied.discount),
            code: applied.code,
            discount_type: coupon.discount_type,
            value: coupon.value,
            discount: applied.discount,
        })
    }

    /// All coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, AppError> {
        Ok(self.coupons.list().await?)
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the coupon does not exist.
    pub async fn get(&self, id: CouponId) -> Result<Coupon, AppError> {
        self.coupons
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input or a duplicate code.
    #[instrument(skip(self, draft), fields(code = %draft.code))]
    pub async fn create(&self, draft: CouponDraft) -> Result<Coupon, AppError> {
        let coupon = self.coupons.create(&draft.validate()?).await?;
        self.cache.invalidate().await;
        Ok(coupon)
    }

    /// Overwrite a coupon's rules. Usage counters are preserved.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input or a duplicate code,
    /// and `AppError::NotFound` if the coupon does not exist.
    #[instrument(skip(self, draft), fields(coupon_id = %id))]
    pub async fn update(&self, id: CouponId, draft: CouponDraft) -> Result<Coupon, AppError> {
        let coupon = self
            .coupons
            .update(id, &draft.validate()?)
            .await
            .map_err(not_found("Coupon not found"))?;
        self.cache.invalidate().await;
        Ok(coupon)
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the coupon does not exist.
    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn delete(&self, id: CouponId) -> Result<(), AppError> {
        self.coupons
            .delete(id)
            .await
            .map_err(not_found("Coupon not found"))?;
        self.cache.invalidate().await;
        Ok(())
    }
}

fn not_found(message: &'static str) -> impl Fn(RepositoryError) -> AppError {
    move |err| match err {
        RepositoryError::NotFound => AppError::NotFound(message.to_string()),
        other => AppError::Database(other),
    }
}
