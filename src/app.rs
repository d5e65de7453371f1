//! Application state and HTTP router construction.
//!
//! Used by `main` and by the HTTP tests to build the Axum app.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::db::Database;

/// Shared state for HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub catalog: Catalog,
}

impl AppState {
    /// Wire the catalog to the SQLite store.
    pub fn new(config: Arc<Config>, db: Database) -> Self {
        let catalog = Catalog::new(Arc::new(db.books()), config.query_timeout);
        Self {
            config,
            db,
            catalog,
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any)
}

/// Build the full Axum router: API routes, layers, and fallback.
/// Returns Router<()> (state fully applied) for use with axum::serve.
pub fn build_app(state: AppState) -> Router<()> {
    let cors = cors_layer(&state.config);
    Router::new()
        .merge(api::router())
        .fallback(api::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
