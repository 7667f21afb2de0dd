//! Order handlers: checkout, history, UPI proof and admin verification.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use atelier_core::OrderId;
use atelier_core::order::{CheckoutRequest, Order};

use crate::db::{AdminOrderFilter, orders::AdminOrder};
use crate::error::{Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::checkout::CheckoutService;
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Body of `POST /orders/{id}/upi-proof`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpiProofRequest {
    #[serde(default)]
    pub transaction_id: String,
}

/// Body of `PUT /orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

/// `POST /orders`
#[instrument(skip(state, user, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> Result<impl IntoResponse> {
    let order = CheckoutService::new(state.pool(), state.pricing(), state.coupon_cache())
        .place_order(&user, body)
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        &[("order_id", &order.id.to_string())],
    );

    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /orders/my`
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool()).list_mine(user.id).await?;
    Ok(Json(orders))
}

/// `GET /orders/admin`
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(filter): ApiQuery<AdminOrderFilter>,
) -> Result<Json<Vec<AdminOrder>>> {
    let orders = OrderService::new(state.pool()).search(&filter).await?;
    Ok(Json(orders))
}

/// `GET /orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool())
        .get_visible(id, &user.actor())
        .await?;
    Ok(Json(order))
}

/// `POST /orders/{id}/upi-proof`
pub async fn submit_upi_proof(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<UpiProofRequest>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool())
        .submit_upi_proof(id, &user.actor(), &body.transaction_id)
        .await?;
    Ok(Json(order))
}

/// `PUT /orders/{id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool())
        .set_status(id, &admin.actor(), &body.status)
        .await?;
    Ok(Json(order))
}
