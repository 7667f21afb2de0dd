//! Checkout error taxonomy.
//!
//! The pricing engine and the coupon evaluator report typed failures; the
//! HTTP layer maps them onto status codes at the request boundary.

use thiserror::Error;

use crate::coupon::CouponRejection;

/// Errors raised while turning a cart into a priced order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Malformed or missing input. Per-line problems carry the 1-based line index.
    #[error("{0}")]
    Validation(String),

    /// A referenced product does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The coupon could not be applied.
    #[error(transparent)]
    Coupon(#[from] CouponRejection),
}

impl CheckoutError {
    /// Validation error for the cart line at `index` (0-based).
    #[must_use]
    pub fn line(index: usize, message: impl std::fmt::Display) -> Self {
        Self::Validation(format!("Item {}: {message}", index + 1))
    }
}
