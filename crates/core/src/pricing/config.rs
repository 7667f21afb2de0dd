//! Pricing knobs.

use serde::{Deserialize, Serialize};

use crate::order::Dimension;
use crate::types::Money;

/// Custom-measurement limits in inches. A value strictly above its limit
/// makes the garment oversize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementThresholds {
    pub bust: f64,
    pub waist: f64,
    pub hips: f64,
    pub shoulder: f64,
}

impl MeasurementThresholds {
    /// The limit for one dimension.
    #[must_use]
    pub const fn limit(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Bust => self.bust,
            Dimension::Waist => self.waist,
            Dimension::Hips => self.hips,
            Dimension::Shoulder => self.shoulder,
        }
    }
}

impl Default for MeasurementThresholds {
    fn default() -> Self {
        Self {
            bust: 40.0,
            waist: 33.0,
            hips: 43.0,
            shoulder: 15.0,
        }
    }
}

/// Fees and thresholds used by the pricing engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Added per unit when a line is oversize.
    pub oversize_surcharge: Money,
    /// Flat fee for cash-on-delivery orders.
    pub cod_fee: Money,
    pub thresholds: MeasurementThresholds,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            oversize_surcharge: Money::from_rupees(200),
            cod_fee: Money::from_rupees(90),
            thresholds: MeasurementThresholds::default(),
        }
    }
}
