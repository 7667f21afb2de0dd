//! Orders and their line items.
//!
//! An order is a snapshot: names and unit prices are copied from the catalog
//! when it is placed and never re-read. After creation only the lifecycle
//! fields (statuses, `paid`, UPI proof) change.

pub mod input;
pub mod lifecycle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coupon::CouponCode;
use crate::error::CheckoutError;
use crate::types::{Money, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId};

pub use input::{CartLine, CartLineInput, CheckoutRequest};
pub use lifecycle::{Actor, LifecycleError};

/// Lining selection on a line item. Absent when the product has no lining option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lining {
    With,
    Without,
}

/// A body dimension of a custom measurement set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Bust,
    Waist,
    Hips,
    Shoulder,
}

/// Custom measurements in inches, kept as the trimmed strings the shopper entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bust: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hips: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoulder: Option<String>,
}

impl Measurements {
    /// Trim every field and drop blank ones. `None` when nothing is left.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        }

        let normalized = Self {
            bust: clean(self.bust),
            waist: clean(self.waist),
            hips: clean(self.hips),
            shoulder: clean(self.shoulder),
        };
        (!normalized.is_empty()).then_some(normalized)
    }

    /// Whether no dimension is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bust.is_none() && self.waist.is_none() && self.hips.is_none() && self.shoulder.is_none()
    }

    /// The provided dimensions with their raw values.
    pub fn dimensions(&self) -> impl Iterator<Item = (Dimension, &str)> {
        [
            (Dimension::Bust, self.bust.as_deref()),
            (Dimension::Waist, self.waist.as_deref()),
            (Dimension::Hips, self.hips.as_deref()),
            (Dimension::Shoulder, self.shoulder.as_deref()),
        ]
        .into_iter()
        .filter_map(|(dimension, value)| value.map(|v| (dimension, v)))
    }
}

/// One priced line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: ProductId,
    /// Product name at order time.
    pub name: String,
    /// Unit price at order time, lining included, surcharge excluded.
    pub price: Money,
    pub quantity: u32,
    pub size: Option<String>,
    pub custom_measurements: Option<Measurements>,
    /// Oversize surcharge per unit.
    pub surcharge: Money,
    pub lining: Option<Lining>,
}

impl OrderItem {
    /// `(price + surcharge) × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        (self.price + self.surcharge) * self.quantity
    }
}

/// Where the order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Trim every field, rejecting blank required ones.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` naming the first blank field.
    pub fn normalized(self) -> Result<Self, CheckoutError> {
        fn required(value: String, field: &str) -> Result<String, CheckoutError> {
            let value = value.trim().to_owned();
            if value.is_empty() {
                return Err(CheckoutError::Validation(format!(
                    "Shipping address {field} is required"
                )));
            }
            Ok(value)
        }

        Ok(Self {
            full_name: required(self.full_name, "full name")?,
            phone: required(self.phone, "phone")?,
            address_line1: required(self.address_line1, "address line 1")?,
            address_line2: self
                .address_line2
                .map(|line| line.trim().to_owned())
                .filter(|line| !line.is_empty()),
            city: required(self.city, "city")?,
            state: required(self.state, "state")?,
            postal_code: required(self.postal_code, "postal code")?,
            country: required(self.country, "country")?,
        })
    }
}

/// Itemized pricing breakdown, frozen at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub items_price: Money,
    pub discount_amount: Money,
    pub shipping_price: Money,
    pub tax_price: Money,
    pub cod_fee: Money,
    pub total_price: Money,
}

impl Pricing {
    /// Build a breakdown, clamping the discount to the items subtotal.
    #[must_use]
    pub fn new(
        items_price: Money,
        discount_amount: Money,
        shipping_price: Money,
        tax_price: Money,
        cod_fee: Money,
    ) -> Self {
        let discount_amount = discount_amount.min(items_price).max(Money::ZERO);
        let total_price =
            items_price - discount_amount + shipping_price + tax_price + cod_fee;
        Self {
            items_price,
            discount_amount,
            shipping_price,
            tax_price,
            cod_fee,
            total_price,
        }
    }

    /// Whether the total equals the sum of its parts and nothing is negative.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_price
            == self.items_price - self.discount_amount
                + self.shipping_price
                + self.tax_price
                + self.cod_fee
            && self.discount_amount <= self.items_price
            && !self.total_price.is_negative()
    }
}

/// UPI payment proof submitted by the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpiProof {
    pub transaction_id: String,
    pub submitted_at: DateTime<Utc>,
}

/// An order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub pricing: Pricing,
    pub coupon_code: Option<CouponCode>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub pricing: Pricing,
    pub coupon_code: Option<CouponCode>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub upi: Option<UpiProof>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
