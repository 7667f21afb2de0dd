//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Email/password accounts
//! - `checkout` - Cart pricing and order placement
//! - `coupons` - Coupon previews, the cached public list and admin CRUD
//! - `orders` - Order reads, UPI proof and admin payment decisions

pub mod auth;
pub mod checkout;
pub mod coupons;
pub mod orders;
