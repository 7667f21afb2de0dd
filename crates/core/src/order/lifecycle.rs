//! Order lifecycle state machine.
//!
//! ```text
//! pending ──(owner submits UPI proof)──> pending_verification
//!    │                                         │
//!    └───────────(admin decision)──────────────┴──> paid | rejected
//! ```
//!
//! Admin decisions are unconstrained: any source state may move to any of
//! the three admin targets. `status` and `payment_status` are always written
//! together.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{NewOrder, Order, ShippingAddress, UpiProof};
use crate::pricing::PricedOrder;
use crate::types::{OrderStatus, PaymentStatus, UserId, UserRole};

/// Statuses an admin may set.
pub const ADMIN_TARGETS: [PaymentStatus; 3] = [
    PaymentStatus::PendingVerification,
    PaymentStatus::Paid,
    PaymentStatus::Rejected,
];

/// Errors from lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The caller may not perform this transition on this order.
    #[error("{0}")]
    Forbidden(String),

    /// The transition input is invalid.
    #[error("{0}")]
    Validation(String),
}

/// The authenticated caller driving a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Actor {
    #[must_use]
    pub const fn new(user_id: UserId, role: UserRole) -> Self {
        Self { user_id, role }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

/// Parse an admin target status.
///
/// # Errors
///
/// Returns `LifecycleError::Validation` for anything outside [`ADMIN_TARGETS`].
pub fn parse_admin_target(value: &str) -> Result<PaymentStatus, LifecycleError> {
    ADMIN_TARGETS
        .into_iter()
        .find(|target| target.as_str() == value.trim())
        .ok_or_else(|| {
            LifecycleError::Validation(format!(
                "Invalid status '{value}'. Allowed: pending_verification, paid, rejected"
            ))
        })
}

impl NewOrder {
    /// The creation transition: every new order starts `pending`, COD included.
    #[must_use]
    pub fn place(user_id: UserId, priced: PricedOrder, shipping_address: ShippingAddress) -> Self {
        Self {
            user_id,
            items: priced.items,
            shipping_address,
            payment_method: priced.payment_method,
            pricing: priced.pricing,
            coupon_code: priced.coupon_code,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
        }
    }
}

impl Order {
    /// Whether `user_id` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Owners and admins may read an order.
    #[must_use]
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.is_admin() || self.is_owned_by(actor.user_id)
    }

    /// Record a UPI transaction id and move to `pending_verification`.
    ///
    /// Re-submission overwrites the previous proof.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if `actor` does not own the order
    /// - `Validation` if the transaction id is blank
    pub fn submit_upi_proof(
        &mut self,
        actor: &Actor,
        transaction_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if !self.is_owned_by(actor.user_id) {
            return Err(LifecycleError::Forbidden(
                "Only the customer who placed this order can submit payment proof".to_owned(),
            ));
        }

        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() {
            return Err(LifecycleError::Validation(
                "Transaction ID is required".to_owned(),
            ));
        }

        self.upi = Some(UpiProof {
            transaction_id: transaction_id.to_owned(),
            submitted_at: now,
        });
        self.set_status(PaymentStatus::PendingVerification);
        self.updated_at = now;
        Ok(())
    }

    /// Apply an admin payment decision.
    ///
    /// `paid` stamps `paid_at`; every other target clears it. The order is
    /// untouched when an error is returned.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if `actor` is not an admin
    /// - `Validation` if `target` is not one of [`ADMIN_TARGETS`]
    pub fn apply_admin_status(
        &mut self,
        actor: &Actor,
        target: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentStatus, LifecycleError> {
        if !actor.is_admin() {
            return Err(LifecycleError::Forbidden(
                "Admin access required".to_owned(),
            ));
        }
        let target = parse_admin_target(target)?;

        self.set_status(target);
        if target == PaymentStatus::Paid {
            self.paid = true;
            self.paid_at = Some(now);
        } else {
            self.paid = false;
            self.paid_at = None;
        }
        self.updated_at = now;
        Ok(target)
    }

    fn set_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.status = status.into();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::order::Pricing;
    use crate::types::{Money, OrderId, PaymentMethod};

    fn order(owner: i32) -> Order {
        let created = Utc::now();
        Order {
            id: OrderId::new(10),
            user_id: UserId::new(owner),
            items: Vec::new(),
            shipping_address: ShippingAddress {
                full_name: "Anika".to_owned(),
                phone: "9000000000".to_owned(),
                address_line1: "1 Park Street".to_owned(),
                address_line2: None,
                city: "Kolkata".to_owned(),
                state: "West Bengal".to_owned(),
                postal_code: "700016".to_owned(),
                country: "India".to_owned(),
            },
            payment_method: PaymentMethod::Upi,
            pricing: Pricing::new(
                Money::from_rupees(1000),
                Money::ZERO,
                Money::ZERO,
                Money::ZERO,
                Money::ZERO,
            ),
            coupon_code: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            paid: false,
            paid_at: None,
            upi: None,
            created_at: created,
            updated_at: created,
        }
    }

    const OWNER: Actor = Actor::new(UserId::new(1), UserRole::Customer);
    const STRANGER: Actor = Actor::new(UserId::new(2), UserRole::Customer);
    const ADMIN: Actor = Actor::new(UserId::new(99), UserRole::Admin);

    #[test]
    fn test_upi_proof_by_non_owner_is_forbidden() {
        let mut o = order(1);
        let err = o
            .submit_upi_proof(&STRANGER, "UTR123", Utc::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
        assert_eq!(o.status, OrderStatus::Pending);
        assert!(o.upi.is_none());
    }

    #[test]
    fn test_upi_proof_blank_id_is_validation_error() {
        let mut o = order(1);
        let err = o.submit_upi_proof(&OWNER, "   ", Utc::now()).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::Validation("Transaction ID is required".to_owned())
        );
    }

    #[test]
    fn test_upi_proof_moves_both_statuses() {
        let mut o = order(1);
        let now = Utc::now();
        o.submit_upi_proof(&OWNER, " UTR-4471 ", now).unwrap();

        assert_eq!(o.status, OrderStatus::PendingVerification);
        assert_eq!(o.payment_status, PaymentStatus::PendingVerification);
        let proof = o.upi.as_ref().unwrap();
        assert_eq!(proof.transaction_id, "UTR-4471");
        assert_eq!(proof.submitted_at, now);
    }

    #[test]
    fn test_upi_proof_resubmission_overwrites() {
        let mut o = order(1);
        o.submit_upi_proof(&OWNER, "FIRST", Utc::now()).unwrap();
        o.submit_upi_proof(&OWNER, "SECOND", Utc::now()).unwrap();
        assert_eq!(o.upi.unwrap().transaction_id, "SECOND");
    }

    #[test]
    fn test_admin_paid_sets_paid_at() {
        let mut o = order(1);
        let now = Utc::now();
        let target = o.apply_admin_status(&ADMIN, "paid", now).unwrap();

        assert_eq!(target, PaymentStatus::Paid);
        assert_eq!(o.status, OrderStatus::Paid);
        assert_eq!(o.payment_status, PaymentStatus::Paid);
        assert!(o.paid);
        assert_eq!(o.paid_at, Some(now));
    }

    #[test]
    fn test_admin_rejected_clears_paid() {
        let mut o = order(1);
        o.apply_admin_status(&ADMIN, "paid", Utc::now()).unwrap();
        o.apply_admin_status(&ADMIN, "rejected", Utc::now()).unwrap();

        assert_eq!(o.status, OrderStatus::Rejected);
        assert!(!o.paid);
        assert_eq!(o.paid_at, None);
    }

    #[test]
    fn test_admin_can_move_rejected_back_to_paid() {
        let mut o = order(1);
        o.apply_admin_status(&ADMIN, "rejected", Utc::now()).unwrap();
        o.apply_admin_status(&ADMIN, "paid", Utc::now()).unwrap();
        assert_eq!(o.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_admin_invalid_target_leaves_order_untouched() {
        let mut o = order(1);
        let before = o.clone();
        for target in ["shipped", "pending", "PAID", ""] {
            let err = o.apply_admin_status(&ADMIN, target, Utc::now()).unwrap_err();
            assert!(matches!(err, LifecycleError::Validation(_)));
        }
        assert_eq!(o, before);
    }

    #[test]
    fn test_non_admin_cannot_set_status() {
        let mut o = order(1);
        let err = o.apply_admin_status(&OWNER, "paid", Utc::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
        assert!(!o.paid);
    }

    #[test]
    fn test_visibility() {
        let o = order(1);
        assert!(o.is_visible_to(&OWNER));
        assert!(o.is_visible_to(&ADMIN));
        assert!(!o.is_visible_to(&STRANGER));
    }
}
