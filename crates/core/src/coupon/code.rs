//! Canonical coupon codes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a coupon code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponCodeError {
    #[error("coupon code cannot be empty")]
    Empty,

    #[error("coupon code is too long (max {max} characters)")]
    TooLong { max: usize },

    #[error("coupon code may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// A coupon code, stored and compared uppercased.
///
/// Lookups are case-insensitive because every code is canonicalized on the
/// way in.
///
/// ```
/// use atelier_core::coupon::CouponCode;
///
/// let code = CouponCode::parse(" save10 ").unwrap();
/// assert_eq!(code.as_str(), "SAVE10");
/// assert!(CouponCode::parse("10% off").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    /// Maximum code length.
    pub const MAX_LENGTH: usize = 40;

    /// Parse and canonicalize a code.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, or contains
    /// characters other than ASCII letters, digits, `-` and `_`.
    pub fn parse(s: &str) -> Result<Self, CouponCodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CouponCodeError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(CouponCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CouponCodeError::InvalidCharacter);
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CouponCode {
    type Err = CouponCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponCodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CouponCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CouponCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CouponCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CouponCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
