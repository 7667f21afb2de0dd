//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Failures become a JSON body
//! `{"message": ...}`; outside production, server errors also carry a
//! `detail` field with the debug representation. Server errors are captured
//! to Sentry before responding.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use atelier_core::CheckoutError;
use atelier_core::coupon::{CouponDraftError, CouponRejection};
use atelier_core::order::LifecycleError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

static EXPOSE_DETAIL: AtomicBool = AtomicBool::new(false);

/// Include debug detail of server errors in response bodies.
///
/// Called once at startup for non-production environments.
pub fn expose_error_detail(enabled: bool) {
    EXPOSE_DETAIL.store(enabled, Ordering::Relaxed);
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart could not be priced or the coupon was refused.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Order state transition refused.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// User may not perform this action.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Too many requests")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CouponRejection> for AppError {
    fn from(rejection: CouponRejection) -> Self {
        Self::Checkout(rejection.into())
    }
}

impl From<CouponDraftError> for AppError {
    fn from(err: CouponDraftError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists
                | AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidName => StatusCode::BAD_REQUEST,
                AuthError::Repository(err) => repository_status(err),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                // NotFound only comes from pricing a submitted cart.
                CheckoutError::Validation(_) | CheckoutError::NotFound(_) => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::Coupon(CouponRejection::Unauthorized) => StatusCode::UNAUTHORIZED,
                CheckoutError::Coupon(CouponRejection::Forbidden(_)) => StatusCode::FORBIDDEN,
                CheckoutError::Coupon(_) => StatusCode::BAD_REQUEST,
            },
            Self::Lifecycle(err) => match err {
                LifecycleError::Forbidden(_) => StatusCode::FORBIDDEN,
                LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return "Internal server error".to_string();
        }
        match self {
            Self::Database(err) | Self::Auth(AuthError::Repository(err)) => match err {
                RepositoryError::NotFound => "Not found".to_string(),
                RepositoryError::Conflict(msg) => msg.clone(),
                _ => "Internal server error".to_string(),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                other => other.to_string(),
            },
            _ => self.to_string(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let server_error = status.is_server_error();

        if server_error {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let detail = (server_error && EXPOSE_DETAIL.load(Ordering::Relaxed))
            .then(|| format!("{self:?}"));

        let body = ErrorBody {
            message: self.public_message(),
            detail,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(status(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_checkout_error_mapping() {
        assert_eq!(
            status(CheckoutError::Validation("Item 1: bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CheckoutError::NotFound("Item 1: product 42 not found".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(CouponRejection::Expired), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(CouponRejection::MinimumNotMet {
                minimum: atelier_core::Money::from_rupees(1000)
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(CouponRejection::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(CouponRejection::Forbidden("no".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_lifecycle_and_repository_mapping() {
        assert_eq!(
            status(LifecycleError::Forbidden("no".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(LifecycleError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(RepositoryError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(RepositoryError::Conflict("dup".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(RepositoryError::DataCorruption("bad row".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_detail_in_message() {
        let err = AppError::Internal("connection string leaked".into());
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_client_errors_keep_message() {
        let err = AppError::from(CouponRejection::Expired);
        assert_eq!(err.public_message(), "Coupon has expired");
    }

    #[tokio::test]
    async fn test_client_error_body_has_no_detail() {
        let response = AppError::BadRequest("Subtotal cannot be negative".into()).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["message"], "Subtotal cannot be negative");
        assert!(body.get("detail").is_none());
    }
}
