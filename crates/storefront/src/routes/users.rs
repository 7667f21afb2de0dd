//! Follow edges between users.
//!
//! The follow graph decides who may redeem an influencer's special coupons.

use axum::{Json, extract::State};
use serde::Serialize;

use atelier_core::UserId;

use crate::db::{FollowRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::ApiPath;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Result of a follow change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub user_id: UserId,
    pub following: bool,
    /// Whether this request changed anything.
    pub changed: bool,
}

/// `POST /users/{id}/follow`
pub async fn follow(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(target): ApiPath<UserId>,
) -> Result<Json<FollowResponse>> {
    if target == user.id {
        return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
    }

    let changed = FollowRepository::new(state.pool())
        .follow(user.id, target)
        .await
        .map_err(|err| match err {
            RepositoryError::NotFound => AppError::NotFound("User not found".to_string()),
            other => AppError::Database(other),
        })?;

    Ok(Json(FollowResponse {
        user_id: target,
        following: true,
        changed,
    }))
}

/// `DELETE /users/{id}/follow`
pub async fn unfollow(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(target): ApiPath<UserId>,
) -> Result<Json<FollowResponse>> {
    let changed = FollowRepository::new(state.pool())
        .unfollow(user.id, target)
        .await?;

    Ok(Json(FollowResponse {
        user_id: target,
        following: false,
        changed,
    }))
}
