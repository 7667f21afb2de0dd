//! Order reads and lifecycle transitions after checkout.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};

use atelier_core::order::{Actor, Order};
use atelier_core::{OrderId, UserId};

use crate::db::{AdminOrderFilter, OrderRepository, orders::AdminOrder};
use crate::error::AppError;

/// Order service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// The caller's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_mine(&self, user_id: UserId) -> Result<Vec<Order>, AppError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Every order matching `filter`, for admins.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn search(&self, filter: &AdminOrderFilter) -> Result<Vec<AdminOrder>, AppError> {
        Ok(self.orders.search(filter).await?)
    }

    /// Load an order the caller may see.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist and
    /// `AppError::Forbidden` if the caller neither owns it nor is an admin.
    pub async fn get_visible(&self, id: OrderId, actor: &Actor) -> Result<Order, AppError> {
        let order = self.load(id).await?;
        if !order.is_visible_to(actor) {
            return Err(AppError::Forbidden(
                "Not authorized to view this order".to_string(),
            ));
        }
        Ok(order)
    }

    /// Record a UPI transaction id submitted by the order's owner.
    ///
    /// # Errors
    ///
    /// `NotFound`, then `Forbidden` for a non-owner, then `BadRequest` for a
    /// blank transaction id.
    #[instrument(skip(self, actor, transaction_id), fields(order_id = %id, user_id = %actor.user_id))]
    pub async fn submit_upi_proof(
        &self,
        id: OrderId,
        actor: &Actor,
        transaction_id: &str,
    ) -> Result<Order, AppError> {
        let mut order = self.load(id).await?;
        order.submit_upi_proof(actor, transaction_id, Utc::now())?;

        let saved = self.orders.save_lifecycle(&order).await?;
        info!(status = %saved.payment_status, "UPI proof submitted");
        Ok(saved)
    }

    /// Apply an admin payment decision.
    ///
    /// # Errors
    ///
    /// `NotFound`, then `Forbidden` for a non-admin, then `BadRequest` for a
    /// target outside `pending_verification`, `paid`, `rejected`.
    #[instrument(skip(self, actor), fields(order_id = %id, admin_id = %actor.user_id))]
    pub async fn set_status(
        &self,
        id: OrderId,
        actor: &Actor,
        target: &str,
    ) -> Result<Order, AppError> {
        let mut order = self.load(id).await?;
        let status = order.apply_admin_status(actor, target, Utc::now())?;

        let saved = self.orders.save_lifecycle(&order).await?;
        info!(%status, "Order status updated");
        Ok(saved)
    }

    async fn load(&self, id: OrderId) -> Result<Order, AppError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }
}
