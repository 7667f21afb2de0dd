//! Atelier Core - shared types and checkout rules.
//!
//! This crate provides the domain types and pure business logic used across
//! all Atelier components:
//! - `storefront` - JSON API serving shoppers and the admin console
//! - `cli` - Command-line tools for migrations, users and seeding
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O, no
//! database access, no HTTP. Callers load authoritative records (products,
//! coupons, follow lists) and hand them in; everything that decides a price or
//! a status transition lives here so it can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails and statuses
//! - [`catalog`] - Products and collections as the pricing engine sees them
//! - [`pricing`] - Size classifier and pricing engine
//! - [`coupon`] - Coupon codes, rules and the coupon evaluator
//! - [`order`] - Orders, checkout input normalization and the lifecycle
//! - [`error`] - Checkout error taxonomy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod coupon;
pub mod error;
pub mod order;
pub mod pricing;
pub mod types;

pub use error::CheckoutError;
pub use types::*;
