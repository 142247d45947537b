use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
///
/// `max_upload_bytes` bounds the size of uploaded theme images.
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes(max_upload_bytes))
        .layer(
            // request id first so the trace span can record it
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/theme",
            get(handlers::get_theme)
                .post(handlers::upload_theme_image)
                .patch(handlers::update_theme),
        )
        .route("/theme/reset", post(handlers::reset_theme))
        .route("/theme/css", get(handlers::theme_stylesheet))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
