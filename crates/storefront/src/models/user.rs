//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use atelier_core::{Email, UserId, UserRole};

/// A storefront account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
