//! Coupon repository.
//!
//! Codes are canonicalized by [`CouponCode`] before they reach SQL, so every
//! lookup here is an exact match on the stored uppercase code.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use atelier_core::coupon::{Coupon, CouponCode, DiscountType, NewCoupon};
use atelier_core::{CouponId, Money, UserId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: CouponId,
    code: String,
    discount_type: DiscountType,
    value: Decimal,
    min_order_amount: Money,
    max_discount: Money,
    expires_at: Option<DateTime<Utc>>,
    active: bool,
    usage_limit: i32,
    used_count: i32,
    special: bool,
    influencer_id: Option<UserId>,
    special_use_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = RepositoryError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let code = CouponCode::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid coupon code in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            code,
            discount_type: row.discount_type,
            value: row.value,
            min_order_amount: row.min_order_amount,
            max_discount: row.max_discount,
            expires_at: row.expires_at,
            active: row.active,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            special: row.special,
            influencer_id: row.influencer_id,
            special_use_count: row.special_use_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const DUPLICATE_CODE: &str = "a coupon with this code already exists";

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, CouponRow>(
            "SELECT * FROM storefront.coupon ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Active, non-special coupons that have not expired at `now`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_public(&self, now: DateTime<Utc>) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, CouponRow>(
            r"
            SELECT * FROM storefront.coupon
            WHERE active AND NOT special
              AND (expires_at IS NULL OR expires_at >= $1)
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM storefront.coupon WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Find a coupon by its canonical code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM storefront.coupon WHERE code = $1")
            .bind(code)
            .fetch_optional(self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Insert a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, coupon: &NewCoupon) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(
            r"
            INSERT INTO storefront.coupon (
                code, discount_type, value, min_order_amount, max_discount,
                expires_at, active, usage_limit, special, influencer_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            ",
        )
        .bind(&coupon.code)
        .bind(coupon.discount_type)
        .bind(coupon.value)
        .bind(coupon.min_order_amount)
        .bind(coupon.max_discount)
        .bind(coupon.expires_at)
        .bind(coupon.active)
        .bind(coupon.usage_limit)
        .bind(coupon.special)
        .bind(coupon.influencer_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique_violation(e, DUPLICATE_CODE))?;

        Coupon::try_from(row)
    }

    /// Overwrite a coupon's rules. Counters are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    /// Returns `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(&self, id: CouponId, coupon: &NewCoupon) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(
            r"
            UPDATE storefront.coupon
            SET code = $2, discount_type = $3, value = $4, min_order_amount = $5,
                max_discount = $6, expires_at = $7, active = $8, usage_limit = $9,
                special = $10, influencer_id = $11
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&coupon.code)
        .bind(coupon.discount_type)
        .bind(coupon.value)
        .bind(coupon.min_order_amount)
        .bind(coupon.max_discount)
        .bind(coupon.expires_at)
        .bind(coupon.active)
        .bind(coupon.usage_limit)
        .bind(coupon.special)
        .bind(coupon.influencer_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique_violation(e, DUPLICATE_CODE))?
        .ok_or(RepositoryError::NotFound)?;

        Coupon::try_from(row)
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.coupon WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count a successful ad-hoc check of a special coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_special_use(&self, id: CouponId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE storefront.coupon SET special_use_count = special_use_count + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Consume one use of a coupon if its limit allows.
    ///
    /// Runs on the caller's connection so it can share the order-insert
    /// transaction. Returns `false` when the limit is already reached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim_usage(conn: &mut PgConnection, id: CouponId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.coupon
            SET used_count = used_count + 1
            WHERE id = $1 AND (usage_limit = 0 OR used_count < usage_limit)
            ",
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
