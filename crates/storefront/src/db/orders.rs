//! Order repository.
//!
//! Pricing fields are written once on insert; only the lifecycle columns are
//! ever updated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use atelier_core::coupon::CouponCode;
use atelier_core::order::{NewOrder, Order, OrderItem, Pricing, ShippingAddress, UpiProof};
use atelier_core::{Money, OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId};

use super::RepositoryError;

macro_rules! order_columns {
    () => {
        r"o.id, o.user_id, o.items, o.shipping_address, o.payment_method,
          o.items_price, o.discount_amount, o.shipping_price, o.tax_price, o.cod_fee,
          o.total_price, o.coupon_code, o.status, o.payment_status, o.paid, o.paid_at,
          o.upi_transaction_id, o.upi_submitted_at, o.created_at, o.updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    items_price: Money,
    discount_amount: Money,
    shipping_price: Money,
    tax_price: Money,
    cod_fee: Money,
    total_price: Money,
    coupon_code: Option<String>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    paid: bool,
    paid_at: Option<DateTime<Utc>>,
    upi_transaction_id: Option<String>,
    upi_submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let coupon_code = row
            .coupon_code
            .as_deref()
            .map(CouponCode::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "invalid coupon code on order {}: {e}",
                    row.id
                ))
            })?;

        let upi = match (row.upi_transaction_id, row.upi_submitted_at) {
            (Some(transaction_id), Some(submitted_at)) => Some(UpiProof {
                transaction_id,
                submitted_at,
            }),
            (None, None) => None,
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "order {} has a partial UPI proof",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            payment_method: PaymentMethod::from(row.payment_method),
            pricing: Pricing {
                items_price: row.items_price,
                discount_amount: row.discount_amount,
                shipping_price: row.shipping_price,
                tax_price: row.tax_price,
                cod_fee: row.cod_fee,
                total_price: row.total_price,
            },
            coupon_code,
            status: row.status,
            payment_status: row.payment_status,
            paid: row.paid,
            paid_at: row.paid_at,
            upi,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AdminOrderRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: String,
    customer_email: String,
}

/// Who placed an order, for the admin list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub name: String,
    pub email: String,
}

/// An order with its customer, as listed to admins.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    pub customer: OrderCustomer,
}

/// Filters for the admin order list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminOrderFilter {
    /// Matches the order id exactly, or a substring of the customer's email or name.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order on the caller's connection (usually a transaction).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(conn: &mut PgConnection, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            r"
            INSERT INTO storefront.order AS o (
                user_id, items, shipping_address, payment_method,
                items_price, discount_amount, shipping_price, tax_price, cod_fee, total_price,
                coupon_code, status, payment_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING ",
            order_columns!()
        ))
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method.as_str())
        .bind(order.pricing.items_price)
        .bind(order.pricing.discount_amount)
        .bind(order.pricing.shipping_price)
        .bind(order.pricing.tax_price)
        .bind(order.pricing.cod_fee)
        .bind(order.pricing.total_price)
        .bind(order.coupon_code.as_ref())
        .bind(order.status)
        .bind(order.payment_status)
        .fetch_one(conn)
        .await?;

        Order::try_from(row)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM storefront.order o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM storefront.order o WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// All orders matching `filter`, newest first, with their customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, filter: &AdminOrderFilter) -> Result<Vec<AdminOrder>, RepositoryError> {
        let q = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let rows = sqlx::query_as::<_, AdminOrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            r",
                   u.name AS customer_name, u.email AS customer_email
            FROM storefront.order o
            JOIN storefront.user u ON u.id = o.user_id
            WHERE ($1::text IS NULL
                   OR o.id::text = $1
                   OR strpos(lower(u.email), lower($1)) > 0
                   OR strpos(lower(u.name), lower($1)) > 0)
              AND ($2::storefront.order_status IS NULL OR o.status = $2)
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(q)
        .bind(filter.status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(AdminOrder {
                    order: Order::try_from(row.order)?,
                    customer: OrderCustomer {
                        name: row.customer_name,
                        email: row.customer_email,
                    },
                })
            })
            .collect()
    }

    /// Persist the lifecycle fields of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order no longer exists.
    pub async fn save_lifecycle(&self, order: &Order) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            r"
            UPDATE storefront.order AS o
            SET status = $2, payment_status = $3, paid = $4, paid_at = $5,
                upi_transaction_id = $6, upi_submitted_at = $7, updated_at = $8
            WHERE o.id = $1
            RETURNING ",
            order_columns!()
        ))
        .bind(order.id)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.paid)
        .bind(order.paid_at)
        .bind(order.upi.as_ref().map(|proof| proof.transaction_id.as_str()))
        .bind(order.upi.as_ref().map(|proof| proof.submitted_at))
        .bind(order.updated_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Order::try_from(row)
    }
}
