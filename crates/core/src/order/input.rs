//! Checkout request body and its normalization.
//!
//! Clients send one canonical shape. Each field family has exactly one
//! normalizer below; input that matches none of the accepted shapes is
//! rejected with the offending line's 1-based index instead of being guessed
//! at. Prices are deliberately absent from the schema.

use serde::Deserialize;
use serde_json::Value;

use super::{Lining, Measurements, ShippingAddress};
use crate::error::CheckoutError;
use crate::types::ProductId;

/// Body of `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub order_items: Vec<CartLineInput>,
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// A cart line as submitted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    /// Product id, as a JSON number or a numeric string.
    #[serde(default)]
    pub product: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub custom_measurements: Option<MeasurementsInput>,
    /// `"with"` or `"without"`.
    #[serde(default)]
    pub lining: Option<String>,
}

/// Custom measurements as submitted; each field may be a string or a number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementsInput {
    #[serde(default)]
    pub bust: Option<MeasurementValue>,
    #[serde(default)]
    pub waist: Option<MeasurementValue>,
    #[serde(default)]
    pub hips: Option<MeasurementValue>,
    #[serde(default)]
    pub shoulder: Option<MeasurementValue>,
}

/// A single measurement value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Text(String),
    Number(serde_json::Number),
}

impl MeasurementValue {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

impl MeasurementsInput {
    /// Trimmed string per provided field; `None` when every field is blank.
    #[must_use]
    pub fn normalize(self) -> Option<Measurements> {
        Measurements {
            bust: self.bust.map(MeasurementValue::into_text),
            waist: self.waist.map(MeasurementValue::into_text),
            hips: self.hips.map(MeasurementValue::into_text),
            shoulder: self.shoulder.map(MeasurementValue::into_text),
        }
        .normalized()
    }
}

/// A validated cart line, ready for pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: Option<String>,
    pub measurements: Option<Measurements>,
    /// The shopper's lining choice, if any was made.
    pub lining: Option<Lining>,
}

/// Largest quantity accepted on a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 1000;

impl CartLineInput {
    /// Validate and normalize this line. `index` is 0-based.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` (prefixed `Item N:`) when the
    /// product reference is missing or malformed, the quantity is not a whole
    /// number from 1 to [`MAX_LINE_QUANTITY`], or the lining choice is unknown.
    pub fn validate(self, index: usize) -> Result<CartLine, CheckoutError> {
        let product_id = self
            .product
            .as_ref()
            .and_then(parse_product_id)
            .ok_or_else(|| CheckoutError::line(index, "a valid product id is required"))?;

        let quantity = self
            .quantity
            .as_ref()
            .and_then(parse_quantity)
            .ok_or_else(|| {
                CheckoutError::line(
                    index,
                    format!("quantity must be a whole number from 1 to {MAX_LINE_QUANTITY}"),
                )
            })?;

        let lining = match self.lining.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(choice) => Some(parse_lining(choice).ok_or_else(|| {
                CheckoutError::line(index, format!("unknown lining option '{choice}'"))
            })?),
        };

        let size = self
            .size
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());

        Ok(CartLine {
            product_id,
            quantity,
            size,
            measurements: self.custom_measurements.and_then(MeasurementsInput::normalize),
            lining,
        })
    }
}

/// Validate every line of a cart, failing on the first bad one.
///
/// # Errors
///
/// Returns `CheckoutError::Validation` if the cart is empty or any line is invalid.
pub fn validate_cart(lines: Vec<CartLineInput>) -> Result<Vec<CartLine>, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::Validation("No order items".to_owned()));
    }
    lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| line.validate(index))
        .collect()
}

fn parse_product_id(value: &Value) -> Option<ProductId> {
    let id = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    i32::try_from(id).ok().filter(|id| *id > 0).map(ProductId::new)
}

fn parse_quantity(value: &Value) -> Option<u32> {
    let Value::Number(n) = value else {
        return None;
    };
    let quantity = match n.as_u64() {
        Some(q) => q,
        None => {
            let f = n.as_f64()?;
            if !f.is_finite() || f.fract() != 0.0 || f < 1.0 || f > f64::from(u32::MAX) {
                return None;
            }
            whole_to_u64(f)
        }
    };
    u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q))
}

// Caller guarantees `f` is a whole number within u32 range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn whole_to_u64(f: f64) -> u64 {
    f as u64
}

fn parse_lining(choice: &str) -> Option<Lining> {
    match choice.to_ascii_lowercase().as_str() {
        "with" => Some(Lining::With),
        "without" => Some(Lining::Without),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn line(value: Value) -> CartLineInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_line_normalizes_fields() {
        let cart = validate_cart(vec![line(json!({
            "product": "7",
            "quantity": 2,
            "size": " xl ",
            "customMeasurements": { "bust": 41, "waist": " ", "hips": "44 " },
            "lining": "With"
        }))])
        .unwrap();

        let first = &cart[0];
        assert_eq!(first.product_id, ProductId::new(7));
        assert_eq!(first.quantity, 2);
        assert_eq!(first.size.as_deref(), Some("xl"));
        assert_eq!(first.lining, Some(Lining::With));
        let m = first.measurements.as_ref().unwrap();
        assert_eq!(m.bust.as_deref(), Some("41"));
        assert_eq!(m.waist, None);
        assert_eq!(m.hips.as_deref(), Some("44"));
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        assert_eq!(
            validate_cart(Vec::new()),
            Err(CheckoutError::Validation("No order items".to_owned()))
        );
    }

    #[test]
    fn test_missing_product_reports_line_index() {
        let err = validate_cart(vec![
            line(json!({ "product": 1, "quantity": 1 })),
            line(json!({ "quantity": 1 })),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Validation("Item 2: a valid product id is required".to_owned())
        );
    }

    #[test]
    fn test_rejects_bad_quantities() {
        for quantity in [json!(0), json!(-1), json!(1.5), json!("2"), Value::Null] {
            let err = line(json!({ "product": 3, "quantity": quantity }))
                .validate(0)
                .unwrap_err();
            assert!(err.to_string().starts_with("Item 1: quantity"), "{err}");
        }
    }

    #[test]
    fn test_quantity_cap() {
        let at_cap = line(json!({ "product": 3, "quantity": MAX_LINE_QUANTITY }))
            .validate(0)
            .unwrap();
        assert_eq!(at_cap.quantity, MAX_LINE_QUANTITY);

        for quantity in [json!(MAX_LINE_QUANTITY + 1), json!(10_000_000), json!(1e12)] {
            let err = line(json!({ "product": 3, "quantity": quantity }))
                .validate(1)
                .unwrap_err();
            assert!(err.to_string().starts_with("Item 2: quantity"), "{err}");
        }
    }

    #[test]
    fn test_accepts_whole_float_quantity() {
        let cart_line = line(json!({ "product": 3, "quantity": 3.0 }))
            .validate(0)
            .unwrap();
        assert_eq!(cart_line.quantity, 3);
    }

    #[test]
    fn test_rejects_object_product_reference() {
        let err = line(json!({ "product": { "id": 3 }, "quantity": 1 }))
            .validate(0)
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[test]
    fn test_rejects_unknown_lining() {
        let err = line(json!({ "product": 3, "quantity": 1, "lining": "silk" }))
            .validate(4)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Item 5: unknown lining option 'silk'"
        );
    }
}
