//! Coupons: codes, admin-maintained rules and the redemption evaluator.

mod code;
mod rules;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CouponId, Money, UserId};

pub use code::{CouponCode, CouponCodeError};
pub use rules::{AppliedCoupon, CouponRejection, Redeemer, discount_for, evaluate};

/// How a coupon's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.discount_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `value` percent of the subtotal.
    Percentage,
    /// A flat `value` rupees.
    Amount,
}

/// A persisted coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub code: CouponCode,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_amount: Money,
    /// Upper bound on the discount. Zero means uncapped.
    pub max_discount: Money,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    /// Zero means unlimited.
    pub usage_limit: i32,
    pub used_count: i32,
    /// Restricted to the influencer's social circle.
    pub special: bool,
    pub influencer_id: Option<UserId>,
    pub special_use_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Whether the expiry date has passed. The expiry instant itself is still valid.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < now)
    }

    /// Whether the usage limit has been used up.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.usage_limit > 0 && self.used_count >= self.usage_limit
    }

    /// Whether the coupon appears in the public active list.
    ///
    /// Special coupons are never advertised.
    #[must_use]
    pub fn is_publicly_listed(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.special && !self.is_expired(now)
    }
}

/// Validation failures for admin coupon input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponDraftError {
    #[error(transparent)]
    Code(#[from] CouponCodeError),

    #[error("coupon value cannot be negative")]
    NegativeValue,

    #[error("percentage discount cannot exceed 100")]
    PercentageTooLarge,

    #[error("{0} cannot be negative")]
    NegativeAmount(&'static str),

    #[error("usage limit cannot be negative")]
    NegativeUsageLimit,
}

/// Coupon fields as submitted by an admin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDraft {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    #[serde(default)]
    pub min_order_amount: Option<Money>,
    #[serde(default)]
    pub max_discount: Option<Money>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub usage_limit: Option<i32>,
    #[serde(default)]
    pub special: bool,
    #[serde(default)]
    pub influencer_id: Option<UserId>,
}

/// A validated coupon ready to insert or overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoupon {
    pub code: CouponCode,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_amount: Money,
    pub max_discount: Money,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub usage_limit: i32,
    pub special: bool,
    pub influencer_id: Option<UserId>,
}

impl CouponDraft {
    /// Validate and canonicalize the draft. Omitted fields take their defaults:
    /// active, no minimum, uncapped, unlimited.
    ///
    /// # Errors
    ///
    /// Returns `CouponDraftError` for a malformed code or negative amounts.
    pub fn validate(self) -> Result<NewCoupon, CouponDraftError> {
        let code = CouponCode::parse(&self.code)?;

        if self.value < Decimal::ZERO {
            return Err(CouponDraftError::NegativeValue);
        }
        if self.discount_type == DiscountType::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(CouponDraftError::PercentageTooLarge);
        }

        let min_order_amount = self.min_order_amount.unwrap_or(Money::ZERO);
        if min_order_amount.is_negative() {
            return Err(CouponDraftError::NegativeAmount("minimum order amount"));
        }
        let max_discount = self.max_discount.unwrap_or(Money::ZERO);
        if max_discount.is_negative() {
            return Err(CouponDraftError::NegativeAmount("maximum discount"));
        }

        let usage_limit = self.usage_limit.unwrap_or(0);
        if usage_limit < 0 {
            return Err(CouponDraftError::NegativeUsageLimit);
        }

        Ok(NewCoupon {
            code,
            discount_type: self.discount_type,
            value: self.value,
            min_order_amount,
            max_discount,
            expires_at: self.expires_at,
            active: self.active.unwrap_or(true),
            usage_limit,
            special: self.special,
            influencer_id: self.influencer_id.filter(|_| self.special),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn draft(value: serde_json::Value) -> CouponDraft {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_draft_defaults() {
        let coupon = draft(json!({ "code": "welcome", "discountType": "amount", "value": 150 }))
            .validate()
            .unwrap();
        assert_eq!(coupon.code.as_str(), "WELCOME");
        assert!(coupon.active);
        assert_eq!(coupon.usage_limit, 0);
        assert_eq!(coupon.max_discount, Money::ZERO);
    }

    #[test]
    fn test_draft_rejects_out_of_range_values() {
        let err = draft(json!({ "code": "BIG", "discountType": "percentage", "value": 120 }))
            .validate()
            .unwrap_err();
        assert_eq!(err, CouponDraftError::PercentageTooLarge);

        let err = draft(json!({ "code": "NEG", "discountType": "amount", "value": -5 }))
            .validate()
            .unwrap_err();
        assert_eq!(err, CouponDraftError::NegativeValue);

        let err = draft(json!({
            "code": "LIMIT", "discountType": "amount", "value": 5, "usageLimit": -1
        }))
        .validate()
        .unwrap_err();
        assert_eq!(err, CouponDraftError::NegativeUsageLimit);
    }

    #[test]
    fn test_draft_drops_influencer_on_regular_coupon() {
        let coupon = draft(json!({
            "code": "PLAIN", "discountType": "amount", "value": 5, "influencerId": 3
        }))
        .validate()
        .unwrap();
        assert_eq!(coupon.influencer_id, None);
    }

    #[test]
    fn test_public_listing_excludes_special_and_expired() {
        let now = Utc::now();
        let mut coupon = Coupon {
            id: CouponId::new(1),
            code: CouponCode::parse("SAVE10").unwrap(),
            discount_type: DiscountType::Percentage,
            value: Decimal::from(10),
            min_order_amount: Money::ZERO,
            max_discount: Money::ZERO,
            expires_at: Some(now + Duration::days(1)),
            active: true,
            usage_limit: 0,
            used_count: 0,
            special: false,
            influencer_id: None,
            special_use_count: 0,
            created_at: now,
            updated_at: now,
        };
        assert!(coupon.is_publicly_listed(now));

        coupon.expires_at = Some(now - Duration::seconds(1));
        assert!(!coupon.is_publicly_listed(now));

        coupon.expires_at = None;
        coupon.special = true;
        assert!(!coupon.is_publicly_listed(now));
    }
}
