//! Checkout orchestration.
//!
//! Turns a submitted cart into a persisted order:
//!
//! 1. normalize the request body
//! 2. load the referenced products from the store
//! 3. price the lines and evaluate the coupon on the authoritative subtotal
//! 4. insert the order, consuming one coupon use in the same transaction
//!
//! Nothing is written unless every step succeeds.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};

use atelier_core::coupon::{AppliedCoupon, CouponRejection};
use atelier_core::order::input::validate_cart;
use atelier_core::order::{CheckoutRequest, NewOrder, Order};
use atelier_core::pricing::PricingEngine;
use atelier_core::{CheckoutError, PaymentMethod, ProductId};

use crate::db::{CouponRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::error::AppError;
use crate::models::CurrentUser;
use crate::services::coupons::{CouponCache, CouponService};

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    products: ProductRepository<'a>,
    coupons: CouponService<'a>,
    engine: &'a PricingEngine,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, engine: &'a PricingEngine, cache: &'a CouponCache) -> Self {
        Self {
            pool,
            products: ProductRepository::new(pool),
            coupons: CouponService::new(pool, cache),
            engine,
        }
    }

    /// Price and persist an order for `customer`.
    ///
    /// # Errors
    ///
    /// - `Checkout(Validation)` for a malformed cart, address or payment method
    /// - `Checkout(NotFound)` when a line references an unknown product
    /// - `Checkout(Coupon(_))` when the coupon is refused, including a usage
    ///   limit reached between evaluation and insert
    /// - `Database` if persistence fails
    #[instrument(skip(self, customer, request), fields(user_id = %customer.id))]
    pub async fn place_order(
        &self,
        customer: &CurrentUser,
        request: CheckoutRequest,
    ) -> Result<Order, AppError> {
        let lines = validate_cart(request.order_items)?;

        let shipping_address = request
            .shipping_address
            .ok_or_else(|| CheckoutError::Validation("Shipping address is required".to_owned()))?
            .normalized()?;

        let payment_method = request
            .payment_method
            .filter(|method| !method.trim().is_empty())
            .map(PaymentMethod::from)
            .ok_or_else(|| CheckoutError::Validation("Payment method is required".to_owned()))?;

        let ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        let catalog = self.products.get_many(&ids).await?;
        let priced_lines = self.engine.price_lines(&lines, &catalog)?;

        let coupon = match request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
        {
            Some(code) => Some(
                self.coupons
                    .resolve(code, priced_lines.items_price, Some(customer.id), Utc::now())
                    .await
                    .map_err(refused_at_checkout)?,
            ),
            None => None,
        };

        let priced = self
            .engine
            .finalize(priced_lines, coupon.as_ref(), payment_method);
        let new_order = NewOrder::place(customer.id, priced, shipping_address);

        let order = self.persist(&new_order, coupon.as_ref()).await?;

        info!(
            order_id = %order.id,
            total = %order.pricing.total_price,
            coupon = ?order.coupon_code,
            "Order placed"
        );

        Ok(order)
    }

    /// Insert the order and, for special coupons, claim one use atomically.
    async fn persist(
        &self,
        order: &NewOrder,
        coupon: Option<&AppliedCoupon>,
    ) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        if let Some(applied) = coupon.filter(|applied| applied.special)
            && !CouponRepository::claim_usage(&mut *tx, applied.coupon_id).await?
        {
            return Err(refused_at_checkout(CouponRejection::UsageLimitReached.into()));
        }

        let order = OrderRepository::insert(&mut *tx, order).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(order)
    }
}

/// A coupon refused while placing an order is a fault in the submitted cart.
fn refused_at_checkout(err: AppError) -> AppError {
    match err {
        AppError::Checkout(CheckoutError::Coupon(rejection)) => {
            AppError::BadRequest(rejection.to_string())
        }
        other => other,
    }
}
