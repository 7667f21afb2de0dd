//! Coupon redemption rules.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::{Coupon, CouponCode, DiscountType};
use crate::types::{CouponId, Money, UserId};

/// Why a coupon could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Invalid coupon code")]
    NotFound,

    #[error("Coupon is not active")]
    Inactive,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon usage limit reached")]
    UsageLimitReached,

    #[error("Minimum order amount of {minimum} required for this coupon")]
    MinimumNotMet { minimum: Money },

    /// A special coupon was presented without a signed-in user.
    #[error("Please sign in to use this coupon")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),
}

/// The signed-in shopper redeeming a coupon, with their follow edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redeemer {
    pub user_id: UserId,
    /// Users this shopper follows.
    pub following: HashSet<UserId>,
    /// Users following this shopper.
    pub followers: HashSet<UserId>,
}

impl Redeemer {
    /// Whether the shopper follows `other` or is followed by them.
    #[must_use]
    pub fn is_connected_to(&self, other: UserId) -> bool {
        self.following.contains(&other) || self.followers.contains(&other)
    }
}

/// A coupon that passed every rule, with its discount on the given subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    #[serde(skip)]
    pub coupon_id: CouponId,
    pub code: CouponCode,
    pub discount: Money,
    #[serde(skip)]
    pub special: bool,
}

/// Discount `coupon` grants on `subtotal`, before any eligibility checks.
///
/// Percentages round half-up to a whole rupee. The result is capped by
/// `max_discount` when that is positive, and always by the subtotal.
#[must_use]
pub fn discount_for(coupon: &Coupon, subtotal: Money) -> Money {
    let raw = match coupon.discount_type {
        DiscountType::Percentage => subtotal.percent(coupon.value),
        DiscountType::Amount => Money::new(coupon.value),
    };
    let capped = if coupon.max_discount.is_positive() {
        raw.min(coupon.max_discount)
    } else {
        raw
    };
    capped.min(subtotal).max(Money::ZERO)
}

/// Check whether `coupon` may be redeemed against `subtotal` by `redeemer`.
///
/// Rules short-circuit in this order: existence, active flag, expiry, usage
/// limit, minimum order amount, then the special-coupon audience. A special
/// coupon without an influencer is refused to everyone, admins included.
///
/// # Errors
///
/// Returns the first [`CouponRejection`] that applies.
pub fn evaluate(
    coupon: Option<&Coupon>,
    subtotal: Money,
    redeemer: Option<&Redeemer>,
    now: DateTime<Utc>,
) -> Result<AppliedCoupon, CouponRejection> {
    let coupon = coupon.ok_or(CouponRejection::NotFound)?;

    if !coupon.active {
        return Err(CouponRejection::Inactive);
    }
    if coupon.is_expired(now) {
        return Err(CouponRejection::Expired);
    }
    if coupon.is_exhausted() {
        return Err(CouponRejection::UsageLimitReached);
    }
    if subtotal < coupon.min_order_amount {
        return Err(CouponRejection::MinimumNotMet {
            minimum: coupon.min_order_amount,
        });
    }

    if coupon.special {
        let influencer = coupon.influencer_id.ok_or_else(|| {
            CouponRejection::Forbidden("This coupon is not available".to_owned())
        })?;
        let redeemer = redeemer.ok_or(CouponRejection::Unauthorized)?;
        if !redeemer.is_connected_to(influencer) {
            return Err(CouponRejection::Forbidden(
                "This coupon is only available to followers of its creator".to_owned(),
            ));
        }
    }

    Ok(AppliedCoupon {
        coupon_id: coupon.id,
        code: coupon.code.clone(),
        discount: discount_for(coupon, subtotal),
        special: coupon.special,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::*;

    fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: CouponId::new(1),
            code: CouponCode::parse("SAVE10").unwrap(),
            discount_type,
            value: Decimal::from(value),
            min_order_amount: Money::ZERO,
            max_discount: Money::ZERO,
            expires_at: None,
            active: true,
            usage_limit: 0,
            used_count: 0,
            special: false,
            influencer_id: None,
            special_use_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn special(influencer: Option<i32>) -> Coupon {
        Coupon {
            special: true,
            influencer_id: influencer.map(UserId::new),
            ..coupon(DiscountType::Amount, 100)
        }
    }

    fn redeemer(following: &[i32], followers: &[i32]) -> Redeemer {
        Redeemer {
            user_id: UserId::new(50),
            following: following.iter().copied().map(UserId::new).collect(),
            followers: followers.iter().copied().map(UserId::new).collect(),
        }
    }

    fn rupees(n: i64) -> Money {
        Money::from_rupees(n)
    }

    #[test]
    fn test_missing_coupon_is_not_found() {
        assert_eq!(
            evaluate(None, rupees(1000), None, Utc::now()),
            Err(CouponRejection::NotFound)
        );
    }

    #[test]
    fn test_percentage_discount() {
        let c = coupon(DiscountType::Percentage, 10);
        let applied = evaluate(Some(&c), rupees(2400), None, Utc::now()).unwrap();
        assert_eq!(applied.discount, rupees(240));
        assert_eq!(applied.code.as_str(), "SAVE10");
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let c = coupon(DiscountType::Percentage, 10);
        assert_eq!(discount_for(&c, rupees(2405)), rupees(241));
        assert_eq!(discount_for(&c, rupees(2404)), rupees(240));
    }

    #[test]
    fn test_max_discount_caps() {
        let c = Coupon {
            max_discount: rupees(150),
            ..coupon(DiscountType::Percentage, 10)
        };
        assert_eq!(discount_for(&c, rupees(2400)), rupees(150));
    }

    #[test]
    fn test_amount_discount_capped_at_subtotal() {
        let c = coupon(DiscountType::Amount, 500);
        assert_eq!(discount_for(&c, rupees(300)), rupees(300));
    }

    #[test]
    fn test_minimum_order_boundary() {
        let c = Coupon {
            min_order_amount: rupees(1000),
            ..coupon(DiscountType::Percentage, 10)
        };
        assert_eq!(
            evaluate(Some(&c), rupees(999), None, Utc::now()),
            Err(CouponRejection::MinimumNotMet {
                minimum: rupees(1000)
            })
        );
        assert!(evaluate(Some(&c), rupees(1000), None, Utc::now()).is_ok());
    }

    #[test]
    fn test_rejection_order() {
        let now = Utc::now();
        // Inactive wins over expired and exhausted.
        let c = Coupon {
            active: false,
            expires_at: Some(now - Duration::days(1)),
            usage_limit: 1,
            used_count: 1,
            ..coupon(DiscountType::Amount, 10)
        };
        assert_eq!(
            evaluate(Some(&c), rupees(100), None, now),
            Err(CouponRejection::Inactive)
        );

        let c = Coupon { active: true, ..c };
        assert_eq!(
            evaluate(Some(&c), rupees(100), None, now),
            Err(CouponRejection::Expired)
        );

        let c = Coupon {
            expires_at: None,
            ..c
        };
        assert_eq!(
            evaluate(Some(&c), rupees(100), None, now),
            Err(CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn test_expiry_instant_is_still_valid() {
        let now = Utc::now();
        let c = Coupon {
            expires_at: Some(now),
            ..coupon(DiscountType::Amount, 10)
        };
        assert!(evaluate(Some(&c), rupees(100), None, now).is_ok());
    }

    #[test]
    fn test_unlimited_usage() {
        let c = Coupon {
            usage_limit: 0,
            used_count: 10_000,
            ..coupon(DiscountType::Amount, 10)
        };
        assert!(evaluate(Some(&c), rupees(100), None, Utc::now()).is_ok());
    }

    #[test]
    fn test_special_coupon_for_follower() {
        let c = special(Some(7));
        let r = redeemer(&[7], &[]);
        let applied = evaluate(Some(&c), rupees(1000), Some(&r), Utc::now()).unwrap();
        assert!(applied.special);
        assert_eq!(applied.discount, rupees(100));
    }

    #[test]
    fn test_special_coupon_when_followed_by_influencer() {
        let c = special(Some(7));
        let r = redeemer(&[], &[7]);
        assert!(evaluate(Some(&c), rupees(1000), Some(&r), Utc::now()).is_ok());
    }

    #[test]
    fn test_special_coupon_without_relation_is_forbidden() {
        let c = special(Some(7));
        let r = redeemer(&[8], &[9]);
        assert!(matches!(
            evaluate(Some(&c), rupees(1000), Some(&r), Utc::now()),
            Err(CouponRejection::Forbidden(_))
        ));
    }

    #[test]
    fn test_special_coupon_requires_sign_in() {
        let c = special(Some(7));
        assert_eq!(
            evaluate(Some(&c), rupees(1000), None, Utc::now()),
            Err(CouponRejection::Unauthorized)
        );
    }

    #[test]
    fn test_special_coupon_without_influencer_is_forbidden_for_everyone() {
        let c = special(None);
        // Connected to everyone we could name; still refused.
        let r = redeemer(&[1, 2, 3], &[1, 2, 3]);
        assert!(matches!(
            evaluate(Some(&c), rupees(1000), Some(&r), Utc::now()),
            Err(CouponRejection::Forbidden(_))
        ));
        assert!(matches!(
            evaluate(Some(&c), rupees(1000), None, Utc::now()),
            Err(CouponRejection::Forbidden(_))
        ));
    }
}
