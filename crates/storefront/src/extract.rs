//! Request extractors whose rejections use the JSON error body.

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{PathRejection, QueryRejection},
};

use crate::error::AppError;

/// `axum::Json` with rejections reported as `AppError::BadRequest`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with rejections reported as `AppError::BadRequest`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// `axum::extract::Query` with rejections reported as `AppError::BadRequest`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::{Router, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::db::AdminOrderFilter;

    async fn status_filter(ApiQuery(filter): ApiQuery<AdminOrderFilter>) -> String {
        filter
            .status
            .map_or_else(|| "any".to_owned(), |s| s.as_str().to_owned())
    }

    async fn get_uri(uri: &str) -> (StatusCode, Option<String>, String) {
        let response = Router::new()
            .route("/orders/admin", get(status_filter))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_owned());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_bad_query_is_json_bad_request() {
        let (status, content_type, body) = get_uri("/orders/admin?status=bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type.as_deref(), Some("application/json"));

        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(body["message"].as_str().unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn test_valid_query_reaches_handler() {
        let (status, _, body) = get_uri("/orders/admin?status=paid").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "paid");

        let (_, _, body) = get_uri("/orders/admin").await;
        assert_eq!(body, "any");
    }
}
