//! Cart-to-paid-order flow through the core rules, without a database.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use chrono::Utc;
use serde_json::json;

use atelier_core::coupon::{AppliedCoupon, Coupon, CouponRejection, Redeemer, evaluate};
use atelier_core::order::input::validate_cart;
use atelier_core::order::lifecycle::{Actor, LifecycleError};
use atelier_core::order::{CheckoutRequest, NewOrder, Order};
use atelier_core::pricing::{PricedOrder, PricingConfig, PricingEngine};
use atelier_core::{
    CheckoutError, Money, OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId, UserRole,
};
use atelier_integration_tests::{
    catalog, percentage_coupon, shipping_address, special_coupon,
};

const CUSTOMER: UserId = UserId::new(7);
const INFLUENCER: UserId = UserId::new(42);

fn request(body: serde_json::Value) -> CheckoutRequest {
    serde_json::from_value(body).unwrap()
}

/// Two XL kurtas: (1000 + 200) x 2.
fn xl_kurtas(payment: &str, coupon: Option<&str>) -> CheckoutRequest {
    request(json!({
        "orderItems": [{ "product": 1, "quantity": 2, "size": "XL" }],
        "shippingAddress": {
            "fullName": "Anika Sen",
            "phone": "9000000000",
            "addressLine1": "1 Park Street",
            "city": "Kolkata",
            "state": "West Bengal",
            "postalCode": "700016",
            "country": "India"
        },
        "paymentMethod": payment,
        "couponCode": coupon
    }))
}

fn price(
    request: CheckoutRequest,
    coupon: Option<&Coupon>,
    redeemer: Option<&Redeemer>,
) -> Result<PricedOrder, CheckoutError> {
    let engine = PricingEngine::new(PricingConfig::default());
    let lines = validate_cart(request.order_items)?;
    let method = PaymentMethod::from(request.payment_method.unwrap_or_default());
    let wants_coupon = request.coupon_code.is_some();

    engine.price_order(
        &lines,
        &catalog(),
        |subtotal| {
            if !wants_coupon {
                return Ok(None);
            }
            let applied: AppliedCoupon = evaluate(coupon, subtotal, redeemer, Utc::now())?;
            Ok(Some(applied))
        },
        method,
    )
}

fn persisted(new_order: NewOrder) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId::new(1),
        user_id: new_order.user_id,
        items: new_order.items,
        shipping_address: new_order.shipping_address,
        payment_method: new_order.payment_method,
        pricing: new_order.pricing,
        coupon_code: new_order.coupon_code,
        status: new_order.status,
        payment_status: new_order.payment_status,
        paid: false,
        paid_at: None,
        upi: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_cod_order_without_coupon() {
    let priced = price(xl_kurtas("COD", None), None, None).unwrap();

    assert_eq!(priced.pricing.items_price, Money::from_rupees(2400));
    assert_eq!(priced.pricing.discount_amount, Money::ZERO);
    assert_eq!(priced.pricing.cod_fee, Money::from_rupees(90));
    assert_eq!(priced.pricing.total_price, Money::from_rupees(2490));
    assert!(priced.pricing.is_balanced());
    assert_eq!(priced.items[0].surcharge, Money::from_rupees(200));
}

#[test]
fn test_cod_order_with_percentage_coupon() {
    let coupon = Coupon {
        min_order_amount: Money::from_rupees(500),
        ..percentage_coupon("SAVE10", 10)
    };
    let priced = price(xl_kurtas("cod", Some("save10")), Some(&coupon), None).unwrap();

    assert_eq!(priced.pricing.discount_amount, Money::from_rupees(240));
    assert_eq!(priced.pricing.total_price, Money::from_rupees(2250));
    assert_eq!(priced.coupon_code.unwrap().as_str(), "SAVE10");
}

#[test]
fn test_upi_order_has_no_cod_fee() {
    let priced = price(xl_kurtas("upi", None), None, None).unwrap();

    assert_eq!(priced.payment_method, PaymentMethod::Upi);
    assert_eq!(priced.pricing.cod_fee, Money::ZERO);
    assert_eq!(priced.pricing.total_price, Money::from_rupees(2400));
}

#[test]
fn test_lined_lehenga_uses_lining_price() {
    let body = request(json!({
        "orderItems": [{ "product": "2", "quantity": 1, "size": "M", "lining": "with" }],
        "paymentMethod": "upi"
    }));
    let priced = price(body, None, None).unwrap();

    assert_eq!(priced.items[0].price, Money::from_rupees(5600));
    assert_eq!(priced.pricing.items_price, Money::from_rupees(5600));
}

#[test]
fn test_unknown_product_names_the_line() {
    let body = request(json!({
        "orderItems": [
            { "product": 1, "quantity": 1 },
            { "product": 999, "quantity": 1 }
        ],
        "paymentMethod": "upi"
    }));
    let err = price(body, None, None).unwrap_err();

    assert!(matches!(err, CheckoutError::NotFound(ref message) if message.starts_with("Item 2")));
}

#[test]
fn test_empty_cart_is_rejected() {
    let body = request(json!({ "orderItems": [], "paymentMethod": "cod" }));
    let err = price(body, None, None).unwrap_err();

    assert_eq!(err, CheckoutError::Validation("No order items".to_owned()));
}

#[test]
fn test_minimum_order_amount_boundary() {
    let coupon = Coupon {
        min_order_amount: Money::from_rupees(1000),
        ..percentage_coupon("FESTIVE", 10)
    };

    assert!(evaluate(Some(&coupon), Money::from_rupees(1000), None, Utc::now()).is_ok());
    assert_eq!(
        evaluate(Some(&coupon), Money::from_rupees(999), None, Utc::now()),
        Err(CouponRejection::MinimumNotMet {
            minimum: Money::from_rupees(1000)
        })
    );
}

#[test]
fn test_special_coupon_requires_follow_edge() {
    let coupon = special_coupon("ANIKA15", INFLUENCER);

    let anonymous = price(xl_kurtas("upi", Some("ANIKA15")), Some(&coupon), None).unwrap_err();
    assert_eq!(anonymous, CheckoutError::Coupon(CouponRejection::Unauthorized));

    let stranger = Redeemer {
        user_id: CUSTOMER,
        following: HashSet::from([UserId::new(99)]),
        followers: HashSet::new(),
    };
    let refused = price(
        xl_kurtas("upi", Some("ANIKA15")),
        Some(&coupon),
        Some(&stranger),
    )
    .unwrap_err();
    assert!(matches!(
        refused,
        CheckoutError::Coupon(CouponRejection::Forbidden(_))
    ));

    let follower = Redeemer {
        user_id: CUSTOMER,
        following: HashSet::from([INFLUENCER]),
        followers: HashSet::new(),
    };
    let priced = price(
        xl_kurtas("upi", Some("ANIKA15")),
        Some(&coupon),
        Some(&follower),
    )
    .unwrap();
    assert_eq!(priced.pricing.discount_amount, Money::from_rupees(360));
}

#[test]
fn test_followed_by_influencer_also_qualifies() {
    let coupon = special_coupon("ANIKA15", INFLUENCER);
    let followed = Redeemer {
        user_id: CUSTOMER,
        following: HashSet::new(),
        followers: HashSet::from([INFLUENCER]),
    };

    assert!(evaluate(Some(&coupon), Money::from_rupees(2400), Some(&followed), Utc::now()).is_ok());
}

#[test]
fn test_upi_proof_then_admin_decision() {
    let priced = price(xl_kurtas("upi", None), None, None).unwrap();
    let mut order = persisted(NewOrder::place(CUSTOMER, priced, shipping_address()));
    assert_eq!(order.status, OrderStatus::Pending);

    let owner = Actor::new(CUSTOMER, UserRole::Customer);
    let admin = Actor::new(UserId::new(1), UserRole::Admin);

    let err = order
        .apply_admin_status(&owner, "paid", Utc::now())
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Forbidden(_)));

    order
        .submit_upi_proof(&owner, "  UTR2024ABC ", Utc::now())
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::PendingVerification);
    assert_eq!(order.status, OrderStatus::PendingVerification);
    assert_eq!(order.upi.as_ref().unwrap().transaction_id, "UTR2024ABC");

    order.apply_admin_status(&admin, "paid", Utc::now()).unwrap();
    assert!(order.paid);
    assert!(order.paid_at.is_some());
    assert_eq!(order.status, OrderStatus::Paid);

    order
        .apply_admin_status(&admin, "rejected", Utc::now())
        .unwrap();
    assert!(!order.paid);
    assert!(order.paid_at.is_none());
    assert_eq!(order.payment_status, PaymentStatus::Rejected);
}

#[test]
fn test_admin_cannot_set_unlisted_status() {
    let priced = price(xl_kurtas("cod", None), None, None).unwrap();
    let mut order = persisted(NewOrder::place(CUSTOMER, priced, shipping_address()));
    let admin = Actor::new(UserId::new(1), UserRole::Admin);

    let err = order
        .apply_admin_status(&admin, "shipped", Utc::now())
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)));
    assert_eq!(order.status, OrderStatus::Pending);
}

#[test]
fn test_order_snapshot_survives_serialization() {
    let coupon = percentage_coupon("SAVE10", 10);
    let body = request(json!({
        "orderItems": [
            { "product": 1, "quantity": 2, "size": "XL" },
            {
                "product": 2,
                "quantity": 1,
                "lining": "without",
                "customMeasurements": { "bust": 42, "waist": " ", "hips": "40" }
            }
        ],
        "shippingAddress": shipping_address(),
        "paymentMethod": "cod",
        "couponCode": "SAVE10"
    }));
    let priced = price(body, Some(&coupon), None).unwrap();
    let order = persisted(NewOrder::place(CUSTOMER, priced, shipping_address()));

    let snapshot = serde_json::to_value(&order).unwrap();
    assert_eq!(snapshot["itemsPrice"].as_f64(), Some(7600.0));
    assert_eq!(snapshot["items"][1]["customMeasurements"]["bust"], "42");
    assert!(snapshot["items"][1]["customMeasurements"].get("waist").is_none());

    let reloaded: Order = serde_json::from_value(snapshot).unwrap();
    assert_eq!(reloaded, order);
}
