//! Authentication route handlers.
//!
//! Session-cookie accounts: register, login, logout and the current user.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::UserRole;

use crate::db::UserRepository;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::extract::ApiJson;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Body of `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create a customer account and sign it in.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .register(&body.email, &body.name, &body.password, UserRole::Customer)
        .await?;

    start_session(&session, &user).await?;
    add_breadcrumb("auth", "User registered", &[("user_id", &user.id.to_string())]);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Sign in with email and password.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    start_session(&session, &user).await?;
    add_breadcrumb("auth", "User logged in", &[("user_id", &user.id.to_string())]);

    Ok(Json(user))
}

/// End the session.
pub async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Logged out" })))
}

/// The signed-in user, reloaded from the database.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))
}
