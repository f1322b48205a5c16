//! Route table and the tower middleware stack.

use std::path::PathBuf;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::{self, admin, auth, public};
use crate::metrics::track_requests;
use crate::state::AppState;

/// Multipart framing and text fields ride on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Allowed browser origins; empty means any.
    pub cors_origins: Vec<String>,
    /// Directory holding stored images.
    pub upload_dir: PathBuf,
    /// URL path the directory is mounted under.
    pub uploads_path: String,
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/public/photos", get(public::list))
        .route("/public/photos/{id}", get(public::detail))
        .route("/public/photos/{id}/visit", post(public::visit))
        .route("/photos", get(admin::list).post(admin::create))
        .route("/photos/reorder", patch(admin::reorder))
        .route("/photos/{id}", put(admin::update))
        .route("/photos/{id}/visibility", patch(admin::set_visibility))
        .route("/photos/{id}/featured", patch(admin::set_featured))
        .route("/photos/{id}/archive", patch(admin::set_archived))
        .route("/photos/{id}/history", get(admin::history))
}

pub fn router(state: AppState, config: &HttpConfig) -> Router {
    let body_limit = state.upload.max_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::export_metrics))
        .nest("/api", api_routes())
        .route_layer(middleware::from_fn_with_state(state.metrics.clone(), track_requests))
        .nest_service(&config.uploads_path, ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors(&config.cors_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
