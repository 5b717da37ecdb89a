//! Route table and middleware stack.

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Build the application router.
///
/// CORS mirrors the request origin with credentials allowed so the widget
/// can be embedded on any page of the portfolio site while still carrying
/// its session cookie.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::COOKIE]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/chat", post(handlers::chat))
        .route("/api/history", get(handlers::history))
        .route("/api/seed", post(handlers::seed))
        .route("/api/feedback", post(handlers::feedback))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
