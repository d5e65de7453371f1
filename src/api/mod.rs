//! API route definitions
//!
//! The catalog is served at `/books`; `/healthz` and `/readyz` report process
//! and database health.

pub mod books;
pub mod error;
pub mod health;

use axum::Router;

use crate::AppState;
pub use error::{ApiError, ApiResult};

/// All API routes, without state applied.
pub fn router() -> Router<AppState> {
    Router::new().merge(health::router()).merge(books::router())
}

/// Fallback for unmatched paths.
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}
