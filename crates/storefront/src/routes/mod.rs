//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness
//! GET    /health/ready            - Database readiness
//!
//! # Auth (rate limited)
//! POST   /auth/register           - Create account and sign in
//! POST   /auth/login              - Sign in
//! POST   /auth/logout             - Sign out
//! GET    /auth/me                 - Current user
//!
//! # Catalog
//! GET    /products                - Product list (?collection=)
//! GET    /products/{id}           - Product detail
//! GET    /collections             - Collection list
//!
//! # Orders
//! POST   /orders                  - Checkout
//! GET    /orders/my               - Own orders
//! GET    /orders/admin            - All orders (admin; ?q=, ?status=)
//! GET    /orders/{id}             - Order detail (owner or admin)
//! POST   /orders/{id}/upi-proof   - Submit UPI transaction id (owner)
//! PUT    /orders/{id}/status      - Payment decision (admin)
//!
//! # Coupons
//! GET    /coupons/active          - Public coupon list (cached)
//! POST   /coupons/validate        - Discount preview
//! GET    /coupons                 - All coupons (admin)
//! POST   /coupons                 - Create (admin)
//! GET    /coupons/{id}            - Read (admin)
//! PUT    /coupons/{id}            - Update (admin)
//! DELETE /coupons/{id}            - Delete (admin)
//!
//! # Social graph
//! POST   /users/{id}/follow       - Follow
//! DELETE /users/{id}/follow       - Unfollow
//! ```

pub mod auth;
pub mod coupons;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    match auth_rate_limiter() {
        Some(limiter) => router.layer(limiter),
        None => {
            tracing::warn!("Auth rate limiter could not be configured; running without it");
            router
        }
    }
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/my", get(orders::mine))
        .route("/admin", get(orders::admin_index))
        .route("/{id}", get(orders::show))
        .route("/{id}/upi-proof", post(orders::submit_upi_proof))
        .route("/{id}/status", put(orders::update_status))
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::index).post(coupons::create))
        .route("/active", get(coupons::active))
        .route("/validate", post(coupons::validate))
        .route(
            "/{id}",
            get(coupons::show)
                .put(coupons::update)
                .delete(coupons::destroy),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new().route("/{id}/follow", post(users::follow).delete(users::unfollow))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .route("/collections", get(products::collections))
        .nest("/orders", order_routes())
        .nest("/coupons", coupon_routes())
        .nest("/users", user_routes())
}
