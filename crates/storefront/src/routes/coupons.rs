//! Coupon handlers: public list, redemption preview and admin CRUD.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    response::IntoResponse,
};
use serde_json::json;

use atelier_core::CouponId;
use atelier_core::coupon::{Coupon, CouponDraft};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::services::coupons::{CouponPreview, CouponService, ValidateCouponRequest};
use crate::state::AppState;

fn service(state: &AppState) -> CouponService<'_> {
    CouponService::new(state.pool(), state.coupon_cache())
}

/// `GET /coupons/active`
pub async fn active(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let coupons: Arc<Vec<Coupon>> = service(&state).active().await?;
    Ok((
        [(CACHE_CONTROL, HeaderValue::from_static("public, max-age=60"))],
        Json(coupons.as_ref().clone()),
    ))
}

/// `POST /coupons/validate`
pub async fn validate(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiJson(body): ApiJson<ValidateCouponRequest>,
) -> Result<Json<CouponPreview>> {
    let preview = service(&state)
        .preview(&body, user.map(|u| u.id))
        .await?;
    Ok(Json(preview))
}

/// `GET /coupons`
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(service(&state).list().await?))
}

/// `POST /coupons`
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiJson(draft): ApiJson<CouponDraft>,
) -> Result<impl IntoResponse> {
    let coupon = service(&state).create(draft).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// `GET /coupons/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<CouponId>,
) -> Result<Json<Coupon>> {
    Ok(Json(service(&state).get(id).await?))
}

/// `PUT /coupons/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<CouponId>,
    ApiJson(draft): ApiJson<CouponDraft>,
) -> Result<Json<Coupon>> {
    Ok(Json(service(&state).update(id, draft).await?))
}

/// `DELETE /coupons/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<CouponId>,
) -> Result<Json<serde_json::Value>> {
    service(&state).delete(id).await?;
    Ok(Json(json!({ "message": "Coupon removed" })))
}
