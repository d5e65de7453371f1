//! HTTP error responses
//!
//! Every failure leaves the API as a JSON object with a single `error` key:
//! a `{parameter: message}` map for rejected request parameters, a plain
//! message otherwise. Internal detail is logged, never returned.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};

use crate::catalog::CatalogError;

pub type ApiResult<T> = Result<T, ApiError>;

const QUERY_FAILED: &str = "An error occurred while querying the catalog.";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, error: Value) -> Self {
        Self { status, error }
    }

    /// 400 naming the offending request parameter.
    pub fn rejected(parameter: &str, message: &str) -> Self {
        let mut map = Map::new();
        map.insert(parameter.to_string(), Value::from(message));
        Self::new(StatusCode::BAD_REQUEST, Value::Object(map))
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, json!("Not found."))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, Value::String(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.error }))).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        if let Some((parameter, message)) = err.rejected_parameter() {
            return Self::rejected(parameter, message);
        }
        match &err {
            CatalogError::Timeout(limit) => {
                tracing::warn!(timeout_secs = limit.as_secs_f64(), "Catalog query timed out");
            }
            _ => tracing::error!(error = ?err, "Catalog query failed"),
        }
        Self::internal(QUERY_FAILED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    async fn body(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_facet_rejection_names_facet() {
        let err = ApiError::from(CatalogError::FacetValidation {
            facet: "author",
            message: "Author filter must be a string, not a numeric ID.",
        });
        assert_eq!(
            body(err).await,
            (
                StatusCode::BAD_REQUEST,
                json!({"error": {"author": "Author filter must be a string, not a numeric ID."}})
            )
        );
    }

    #[tokio::test]
    async fn test_query_failure_is_generic() {
        let err = ApiError::from(CatalogError::Query(sqlx::Error::PoolTimedOut));
        let (status, value) = body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value, json!({ "error": QUERY_FAILED }));

        let err = ApiError::from(CatalogError::Timeout(Duration::from_secs(30)));
        assert_eq!(body(err).await.1, json!({ "error": QUERY_FAILED }));
    }

    #[tokio::test]
    async fn test_not_found() {
        assert_eq!(
            body(ApiError::not_found()).await,
            (StatusCode::NOT_FOUND, json!({"error": "Not found."}))
        );
    }
}
