//! Status enums for orders, payments and users.

use serde::{Deserialize, Serialize};

/// Coarse order lifecycle status.
///
/// `Shipped`, `Delivered` and `Cancelled` exist for fulfillment handled
/// outside the checkout core; no transition in this crate produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    PendingVerification,
    Paid,
    Rejected,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The wire/database name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingVerification => "pending_verification",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "pending_verification" => Ok(Self::PendingVerification),
            "paid" => Ok(Self::Paid),
            "rejected" => Ok(Self::Rejected),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment verification status.
///
/// Narrower than [`OrderStatus`]; every transition writes the same value to
/// both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    PendingVerification,
    Paid,
    Rejected,
}

impl PaymentStatus {
    /// The wire/database name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingVerification => "pending_verification",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
        }
    }
}

impl From<PaymentStatus> for OrderStatus {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => Self::Pending,
            PaymentStatus::PendingVerification => Self::PendingVerification,
            PaymentStatus::Paid => Self::Paid,
            PaymentStatus::Rejected => Self::Rejected,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the shopper pays for an order.
///
/// Anything other than `cod` and `upi` is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    /// Cash on delivery; attracts the COD fee.
    Cod,
    /// UPI transfer verified manually from a submitted transaction id.
    Upi,
    /// Any other method name supplied by the client.
    Other(String),
}

impl PaymentMethod {
    /// Whether this is cash on delivery.
    #[must_use]
    pub const fn is_cod(&self) -> bool {
        matches!(self, Self::Cod)
    }

    /// The stored name of this method.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cod => "cod",
            Self::Upi => "upi",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for PaymentMethod {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "cod" => Self::Cod,
            "upi" => Self::Upi,
            _ => Self::Other(normalized),
        }
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        method.as_str().to_owned()
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storefront user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// A shopper.
    #[default]
    Customer,
    /// Store staff: coupon management and payment verification.
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}
