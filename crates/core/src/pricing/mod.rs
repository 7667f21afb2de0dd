//! Server-side order pricing.
//!
//! [`size`] decides whether a line attracts the oversize surcharge and
//! [`engine`] turns validated cart lines into a frozen [`Pricing`]
//! breakdown. Both read their thresholds and fees from one injected
//! [`PricingConfig`].
//!
//! [`Pricing`]: crate::order::Pricing

pub mod config;
pub mod engine;
pub mod size;

pub use config::{MeasurementThresholds, PricingConfig};
pub use engine::{PricedLines, PricedOrder, PricingEngine};
pub use size::is_oversize;
