pub mod files;
pub mod health;
pub mod index;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use http::HeaderValue;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.request_body_limit();

    let api_routes = Router::new()
        .route("/status", get(health::status))
        .route("/files", get(files::list_files).post(files::upload_file))
        .route(
            "/files/{id}",
            get(files::download_file).delete(files::delete_file),
        );

    let cors = cors_layer(&state.config.cors_allowed_origins);

    // Request ID
    let x_request_id = http::HeaderName::from_static("x-request-id");

    Router::new()
        .route("/", get(index::index))
        .route("/health", get(health::health))
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` allows any origin; otherwise a comma-separated list of origins.
fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let origin = if allowed_origins.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
