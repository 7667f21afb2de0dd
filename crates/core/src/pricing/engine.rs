//! Cart pricing.
//!
//! Pricing is split in two so the coupon can be checked against the
//! authoritative subtotal between the steps:
//!
//! 1. [`PricingEngine::price_lines`] resolves every line against the catalog,
//!    picks the unit price, applies the oversize surcharge and sums the
//!    subtotal.
//! 2. [`PricingEngine::finalize`] applies the discount and the COD fee.
//!
//! [`PricingEngine::price_order`] runs both with a coupon callback in between.

use rust_decimal::Decimal;

use super::{PricingConfig, is_oversize};
use crate::catalog::{Product, ProductCatalog};
use crate::coupon::{AppliedCoupon, CouponCode};
use crate::error::CheckoutError;
use crate::order::{CartLine, Lining, OrderItem, Pricing};
use crate::types::{Money, PaymentMethod};

/// Largest subtotal an order may carry (one billion rupees). Stored order
/// amounts are `NUMERIC(12, 2)`, so this leaves headroom for the COD fee.
pub const MAX_ITEMS_PRICE: Money = Money::new(Decimal::from_parts(1_000_000_000, 0, 0, false, 0));

/// Line items priced from the catalog, before discount and fees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLines {
    pub items: Vec<OrderItem>,
    /// Sum of `(unit price + surcharge) × quantity` over all items.
    pub items_price: Money,
}

/// A fully priced order, ready to be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub items: Vec<OrderItem>,
    pub pricing: Pricing,
    pub coupon_code: Option<CouponCode>,
    pub payment_method: PaymentMethod,
}

/// Computes order totals from authoritative catalog data.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    #[must_use]
    pub const fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Price each line against `catalog`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotFound` naming the 1-based line whose product
    /// is not in the catalog, and `CheckoutError::Validation` when the
    /// subtotal exceeds [`MAX_ITEMS_PRICE`].
    pub fn price_lines<C>(&self, lines: &[CartLine], catalog: &C) -> Result<PricedLines, CheckoutError>
    where
        C: ProductCatalog + ?Sized,
    {
        let items = lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let product = catalog.product(line.product_id).ok_or_else(|| {
                    CheckoutError::NotFound(format!(
                        "Item {}: product {} not found",
                        index + 1,
                        line.product_id
                    ))
                })?;
                Ok(self.price_line(line, product))
            })
            .collect::<Result<Vec<_>, CheckoutError>>()?;

        let items_price: Money = items.iter().map(OrderItem::line_total).sum();
        if items_price > MAX_ITEMS_PRICE {
            return Err(CheckoutError::Validation(format!(
                "Order subtotal {items_price} exceeds the maximum of {MAX_ITEMS_PRICE}"
            )));
        }
        Ok(PricedLines { items, items_price })
    }

    fn price_line(&self, line: &CartLine, product: &Product) -> OrderItem {
        let (price, lining) = match product.lining_price() {
            Some(lined) => match line.lining.unwrap_or(Lining::Without) {
                Lining::With => (lined, Some(Lining::With)),
                Lining::Without => (product.price, Some(Lining::Without)),
            },
            None => (product.price, None),
        };

        let surcharge = if is_oversize(
            line.size.as_deref(),
            line.measurements.as_ref(),
            &self.config.thresholds,
        ) {
            self.config.oversize_surcharge
        } else {
            Money::ZERO
        };

        OrderItem {
            product: product.id,
            name: product.name.clone(),
            price,
            quantity: line.quantity,
            size: line.size.clone(),
            custom_measurements: line.measurements.clone(),
            surcharge,
            lining,
        }
    }

    /// Apply the discount and COD fee. Shipping and tax are zero.
    #[must_use]
    pub fn finalize(
        &self,
        lines: PricedLines,
        coupon: Option<&AppliedCoupon>,
        payment_method: PaymentMethod,
    ) -> PricedOrder {
        let discount = coupon.map_or(Money::ZERO, |applied| applied.discount);
        let cod_fee = if payment_method.is_cod() {
            self.config.cod_fee
        } else {
            Money::ZERO
        };

        PricedOrder {
            items: lines.items,
            pricing: Pricing::new(lines.items_price, discount, Money::ZERO, Money::ZERO, cod_fee),
            coupon_code: coupon.map(|applied| applied.code.clone()),
            payment_method,
        }
    }

    /// Price a whole order. `coupon` receives the subtotal and returns the
    /// applied coupon, if any.
    ///
    /// # Errors
    ///
    /// Propagates line errors from [`Self::price_lines`] and any error the
    /// coupon callback returns.
    pub fn price_order<C, F>(
        &self,
        lines: &[CartLine],
        catalog: &C,
        coupon: F,
        payment_method: PaymentMethod,
    ) -> Result<PricedOrder, CheckoutError>
    where
        C: ProductCatalog + ?Sized,
        F: FnOnce(Money) -> Result<Option<AppliedCoupon>, CheckoutError>,
    {
        let priced = self.price_lines(lines, catalog)?;
        let applied = coupon(priced.items_price)?;
        Ok(self.finalize(priced, applied.as_ref(), payment_method))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::coupon::{Coupon, CouponRejection, DiscountType, evaluate};
    use crate::order::Measurements;
    use crate::types::{CouponId, ProductId};

    fn catalog() -> HashMap<ProductId, Product> {
        let kurta = Product {
            id: ProductId::new(1),
            name: "Chanderi Kurta".to_owned(),
            description: String::new(),
            price: Money::from_rupees(1000),
            has_lining: false,
            lining_price: None,
            sizes: vec!["M".to_owned(), "XL".to_owned()],
            collection_id: None,
            created_at: Utc::now(),
        };
        let lehenga = Product {
            id: ProductId::new(2),
            name: "Silk Lehenga".to_owned(),
            price: Money::from_rupees(5000),
            has_lining: true,
            lining_price: Some(Money::from_rupees(5600)),
            ..kurta.clone()
        };
        [kurta, lehenga].into_iter().map(|p| (p.id, p)).collect()
    }

    fn line(product: i32, quantity: u32, size: Option<&str>) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            quantity,
            size: size.map(str::to_owned),
            measurements: None,
            lining: None,
        }
    }

    fn save10() -> Coupon {
        let now = Utc::now();
        Coupon {
            id: CouponId::new(1),
            code: CouponCode::parse("SAVE10").unwrap(),
            discount_type: DiscountType::Percentage,
            value: Decimal::from(10),
            min_order_amount: Money::from_rupees(500),
            max_discount: Money::ZERO,
            expires_at: None,
            active: true,
            usage_limit: 0,
            used_count: 0,
            special: false,
            influencer_id: None,
            special_use_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn rupees(n: i64) -> Money {
        Money::from_rupees(n)
    }

    #[test]
    fn test_oversize_cod_order() {
        let engine = PricingEngine::default();
        let order = engine
            .price_order(
                &[line(1, 2, Some("XL"))],
                &catalog(),
                |_| Ok(None),
                PaymentMethod::Cod,
            )
            .unwrap();

        let item = &order.items[0];
        assert_eq!(item.price, rupees(1000));
        assert_eq!(item.surcharge, rupees(200));
        assert_eq!(item.lining, None);
        assert_eq!(order.pricing.items_price, rupees(2400));
        assert_eq!(order.pricing.cod_fee, rupees(90));
        assert_eq!(order.pricing.total_price, rupees(2490));
        assert!(order.pricing.is_balanced());
    }

    #[test]
    fn test_oversize_cod_order_with_percentage_coupon() {
        let engine = PricingEngine::default();
        let coupon = save10();
        let order = engine
            .price_order(
                &[line(1, 2, Some("XL"))],
                &catalog(),
                |subtotal| Ok(Some(evaluate(Some(&coupon), subtotal, None, Utc::now())?)),
                PaymentMethod::Cod,
            )
            .unwrap();

        assert_eq!(order.pricing.discount_amount, rupees(240));
        assert_eq!(order.pricing.total_price, rupees(2250));
        assert_eq!(order.coupon_code.unwrap().as_str(), "SAVE10");
    }

    #[test]
    fn test_coupon_rejection_aborts_pricing() {
        let engine = PricingEngine::default();
        let err = engine
            .price_order(
                &[line(1, 1, None)],
                &catalog(),
                |_| Err(CouponRejection::Expired.into()),
                PaymentMethod::Upi,
            )
            .unwrap_err();
        assert_eq!(err, CheckoutError::Coupon(CouponRejection::Expired));
    }

    #[test]
    fn test_lining_selection() {
        let engine = PricingEngine::default();
        let with = CartLine {
            lining: Some(Lining::With),
            ..line(2, 1, Some("M"))
        };
        let unset = line(2, 1, Some("M"));
        let ignored = CartLine {
            lining: Some(Lining::With),
            ..line(1, 1, Some("M"))
        };

        let priced = engine.price_lines(&[with, unset, ignored], &catalog()).unwrap();
        assert_eq!(priced.items[0].price, rupees(5600));
        assert_eq!(priced.items[0].lining, Some(Lining::With));
        assert_eq!(priced.items[1].price, rupees(5000));
        assert_eq!(priced.items[1].lining, Some(Lining::Without));
        assert_eq!(priced.items[2].price, rupees(1000));
        assert_eq!(priced.items[2].lining, None);
        assert_eq!(priced.items_price, rupees(11_600));
    }

    #[test]
    fn test_measurements_trigger_surcharge() {
        let engine = PricingEngine::default();
        let custom = CartLine {
            measurements: Some(Measurements {
                waist: Some("34".to_owned()),
                ..Measurements::default()
            }),
            ..line(1, 3, None)
        };
        let priced = engine.price_lines(&[custom], &catalog()).unwrap();
        assert_eq!(priced.items[0].surcharge, rupees(200));
        assert_eq!(priced.items_price, rupees(3600));
    }

    #[test]
    fn test_unknown_product_is_not_found() {
        let engine = PricingEngine::default();
        let err = engine
            .price_lines(&[line(1, 1, None), line(42, 1, None)], &catalog())
            .unwrap_err();
        assert_eq!(
            err,
            CheckoutError::NotFound("Item 2: product 42 not found".to_owned())
        );
    }

    #[test]
    fn test_subtotal_cap() {
        let engine = PricingEngine::default();
        let luxe = Product {
            id: ProductId::new(9),
            price: Money::new(MAX_ITEMS_PRICE.amount() / Decimal::from(1000)),
            has_lining: false,
            lining_price: None,
            ..catalog()[&ProductId::new(1)].clone()
        };
        let catalog: HashMap<ProductId, Product> = [(luxe.id, luxe)].into_iter().collect();

        let at_cap = engine.price_lines(&[line(9, 1000, None)], &catalog).unwrap();
        assert_eq!(at_cap.items_price, MAX_ITEMS_PRICE);

        let err = engine
            .price_lines(&[line(9, 1000, None), line(9, 1, None)], &catalog)
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(ref m) if m.contains("exceeds")));
    }

    #[test]
    fn test_cod_fee_only_for_cod() {
        let engine = PricingEngine::default();
        let lines = engine.price_lines(&[line(1, 1, None)], &catalog()).unwrap();
        for method in [PaymentMethod::Upi, PaymentMethod::Other("card".to_owned())] {
            let order = engine.finalize(lines.clone(), None, method);
            assert_eq!(order.pricing.cod_fee, Money::ZERO);
            assert_eq!(order.pricing.total_price, rupees(1000));
        }
    }

    #[test]
    fn test_configured_fees() {
        let engine = PricingEngine::new(PricingConfig {
            oversize_surcharge: rupees(250),
            cod_fee: rupees(50),
            ..PricingConfig::default()
        });
        let order = engine
            .price_order(&[line(1, 1, Some("2XL"))], &catalog(), |_| Ok(None), PaymentMethod::Cod)
            .unwrap();
        assert_eq!(order.pricing.total_price, rupees(1300));
    }
}
